use crate::error::{Error, Result};
use std::{fmt, mem};

pub const DEFAULT_PLACEHOLDER: &str = "{}";

/// Control operator deciding whether the next group runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `;`
    Sequence,
    /// `&&`
    And,
    /// `||`
    Or,
}

impl Operator {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            ";" => Some(Operator::Sequence),
            "&&" => Some(Operator::And),
            "||" => Some(Operator::Or),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Sequence => ";",
            Operator::And => "&&",
            Operator::Or => "||",
        }
    }

    /// Whether a group preceded by this operator runs, given how the last executed group went.
    pub fn proceeds(&self, previous_succeeded: bool) -> bool {
        match self {
            Operator::Sequence => true,
            Operator::And => previous_succeeded,
            Operator::Or => !previous_succeeded,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Replaces tokens equal to `marker` with `replacement`.
#[derive(Debug, Clone, Copy)]
pub struct Placeholder<'a> {
    marker: &'a str,
    replacement: &'a str,
}

impl<'a> Placeholder<'a> {
    pub fn new(marker: &'a str, replacement: &'a str) -> Self {
        Self {
            marker,
            replacement,
        }
    }

    fn apply(&self, token: String) -> String {
        if token == self.marker {
            self.replacement.to_owned()
        } else {
            token
        }
    }
}

/// One external process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandGroup {
    program: String,
    args: Vec<String>,
}

impl CommandGroup {
    fn from_tokens(tokens: Vec<String>) -> Option<Self> {
        let mut tokens = tokens.into_iter();
        let program = tokens.next()?;

        Some(Self {
            program,
            args: tokens.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for CommandGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    operator: Operator,
    group: CommandGroup,
}

impl Step {
    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn group(&self) -> &CommandGroup {
        &self.group
    }
}

/// The groups to run on every change, in order. The first step always carries
/// [`Operator::Sequence`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPlan {
    steps: Vec<Step>,
}

impl CommandPlan {
    /// Builds a one-group plan from the simple form. Operator tokens are literal here.
    pub fn single(tokens: Vec<String>, placeholder: Option<Placeholder>) -> Result<Self> {
        let tokens = tokens
            .into_iter()
            .map(|token| substitute(token, placeholder))
            .collect();
        let group = CommandGroup::from_tokens(tokens).ok_or(Error::MissingCommand)?;

        Ok(Self {
            steps: vec![Step {
                operator: Operator::Sequence,
                group,
            }],
        })
    }

    /// Splits the extended form on `;`, `&&` and `||`.
    pub fn parse(tokens: Vec<String>, placeholder: Option<Placeholder>) -> Result<Self> {
        if tokens.is_empty() {
            return Err(Error::MissingCommand);
        }

        let mut steps = Vec::new();
        let mut current = Vec::new();
        let mut pending = Operator::Sequence;
        let mut last_operator = None;

        for (index, token) in tokens.into_iter().enumerate() {
            let position = index + 1;
            let Some(operator) = Operator::from_token(&token) else {
                current.push(substitute(token, placeholder));
                continue;
            };

            let Some(group) = CommandGroup::from_tokens(mem::take(&mut current)) else {
                let reason = if steps.is_empty() {
                    format!("`{operator}` at token {position} has no command before it")
                } else {
                    format!("`{operator}` at token {position} directly follows another operator")
                };
                return Err(Error::InvalidCommandSyntax(reason));
            };

            steps.push(Step {
                operator: pending,
                group,
            });
            pending = operator;
            last_operator = Some((operator, position));
        }

        let Some(group) = CommandGroup::from_tokens(current) else {
            let reason = match last_operator {
                Some((operator, position)) => {
                    format!("`{operator}` at token {position} has no command after it")
                }
                None => "empty command".to_owned(),
            };
            return Err(Error::InvalidCommandSyntax(reason));
        };

        steps.push(Step {
            operator: pending,
            group,
        });

        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

fn substitute(token: String, placeholder: Option<Placeholder>) -> String {
    match placeholder {
        Some(placeholder) => placeholder.apply(token),
        None => token,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    fn groups(plan: &CommandPlan) -> Vec<(Operator, String)> {
        plan.steps()
            .iter()
            .map(|step| (step.operator(), step.group().to_string()))
            .collect()
    }

    #[test]
    fn plain_tokens_make_a_single_group() {
        let placeholder = Placeholder::new("{}", "foo.py");
        let plan = CommandPlan::parse(tokens("python -u {}"), Some(placeholder)).unwrap();

        assert_eq!(plan.steps().len(), 1);
        let group = plan.steps()[0].group();
        assert_eq!(group.program(), "python");
        assert_eq!(group.args(), ["-u", "foo.py"]);
    }

    #[test]
    fn operators_split_groups() {
        let plan = CommandPlan::parse(tokens("echo Start ; gcc -o foo foo.c || echo FAIL && true"), None)
            .unwrap();

        assert_eq!(
            groups(&plan),
            vec![
                (Operator::Sequence, "echo Start".to_owned()),
                (Operator::Sequence, "gcc -o foo foo.c".to_owned()),
                (Operator::Or, "echo FAIL".to_owned()),
                (Operator::And, "true".to_owned()),
            ]
        );
    }

    #[test]
    fn placeholder_must_match_whole_token() {
        let placeholder = Placeholder::new("{}", "src/main.c");
        let plan = CommandPlan::parse(tokens("cc {} -o {}.out {}"), Some(placeholder)).unwrap();

        assert_eq!(
            plan.steps()[0].group().args(),
            ["src/main.c", "-o", "{}.out", "src/main.c"]
        );
    }

    #[test]
    fn placeholder_can_be_the_program() {
        let placeholder = Placeholder::new("@", "./script.sh");
        let plan = CommandPlan::parse(tokens("@ --check && @"), Some(placeholder)).unwrap();

        assert_eq!(
            groups(&plan),
            vec![
                (Operator::Sequence, "./script.sh --check".to_owned()),
                (Operator::And, "./script.sh".to_owned()),
            ]
        );
    }

    #[test]
    fn verbatim_leaves_placeholder_alone() {
        let plan = CommandPlan::parse(tokens("cat {}"), None).unwrap();
        assert_eq!(plan.steps()[0].group().args(), ["{}"]);
    }

    #[test]
    fn empty_tokens_are_a_missing_command() {
        assert!(matches!(
            CommandPlan::parse(Vec::new(), None),
            Err(Error::MissingCommand)
        ));
        assert!(matches!(
            CommandPlan::single(Vec::new(), None),
            Err(Error::MissingCommand)
        ));
    }

    #[test]
    fn leading_operator_is_rejected() {
        let err = CommandPlan::parse(tokens("&& make"), None).unwrap_err();
        match err {
            Error::InvalidCommandSyntax(reason) => {
                assert_eq!(reason, "`&&` at token 1 has no command before it")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn trailing_operator_is_rejected() {
        let err = CommandPlan::parse(tokens("make ||"), None).unwrap_err();
        match err {
            Error::InvalidCommandSyntax(reason) => {
                assert_eq!(reason, "`||` at token 2 has no command after it")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn consecutive_operators_are_rejected() {
        let err = CommandPlan::parse(tokens("make ; && make test"), None).unwrap_err();
        match err {
            Error::InvalidCommandSyntax(reason) => {
                assert_eq!(reason, "`&&` at token 3 directly follows another operator")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn lone_operator_is_invalid_not_missing() {
        assert!(matches!(
            CommandPlan::parse(tokens(";"), None),
            Err(Error::InvalidCommandSyntax(_))
        ));
    }

    #[test]
    fn simple_form_keeps_operators_literal() {
        let placeholder = Placeholder::new("{}", "notes.md");
        let plan = CommandPlan::single(tokens("echo {} && done"), Some(placeholder)).unwrap();

        assert_eq!(plan.steps().len(), 1);
        assert_eq!(plan.steps()[0].group().args(), ["notes.md", "&&", "done"]);
    }

    #[test]
    fn operators_decide_on_previous_result() {
        assert!(Operator::Sequence.proceeds(true));
        assert!(Operator::Sequence.proceeds(false));
        assert!(Operator::And.proceeds(true));
        assert!(!Operator::And.proceeds(false));
        assert!(!Operator::Or.proceeds(true));
        assert!(Operator::Or.proceeds(false));
    }
}
