use serde::{Deserialize, Serialize};

use crate::report::types::TestStatus;

/// Root of the runner's JSON report. Fields other than `suites` are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultTree {
    #[serde(default)]
    pub suites: Vec<Suite>,
}

/// Grouping node: a file or a `describe` block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Suite {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub specs: Vec<Spec>,

    #[serde(default)]
    pub suites: Vec<Suite>,
}

/// A titled test definition. Titles start with the test-case id, e.g. `TC13 - Valid login`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Spec {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub tests: Vec<TestEntry>,
}

/// One concrete execution of a spec (per browser project)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestEntry {
    #[serde(default)]
    pub project_name: Option<String>,

    /// Attempts in execution order; retries append
    #[serde(default)]
    pub results: Vec<Attempt>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub status: TestStatus,

    #[serde(default)]
    pub retry: u32,

    #[serde(default)]
    pub error: Option<AttemptError>,

    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptError {
    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub stack: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub content_type: Option<String>,
}

/// Node of the result tree during traversal
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Suite(&'a Suite),
    Spec(&'a Spec),
    Test(&'a Spec, &'a TestEntry),
}

/// Depth-first walk yielding every test entry with its spec.
///
/// Order: a suite's own specs come before its child suites, and siblings keep
/// their input order.
pub struct Walk<'a> {
    stack: Vec<Node<'a>>,
}

impl<'a> Walk<'a> {
    pub fn new(suites: &'a [Suite]) -> Self {
        Self {
            stack: suites.iter().rev().map(Node::Suite).collect(),
        }
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = (&'a Spec, &'a TestEntry);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            match node {
                Node::Suite(suite) => {
                    // pushed in reverse: specs end up on top of child suites
                    self.stack.extend(suite.suites.iter().rev().map(Node::Suite));
                    self.stack.extend(suite.specs.iter().rev().map(Node::Spec));
                }
                Node::Spec(spec) => {
                    self.stack
                        .extend(spec.tests.iter().rev().map(|t| Node::Test(spec, t)));
                }
                Node::Test(spec, test) => return Some((spec, test)),
            }
        }
        None
    }
}

impl ResultTree {
    pub fn walk(&self) -> Walk<'_> {
        Walk::new(&self.suites)
    }
}
