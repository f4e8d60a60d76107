//! Rule specifications.

use std::fmt;

/// A rule as iptables arguments, without table, chain or position.
///
/// Two specs are the same rule when their argument lists are identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleSpec {
    args: Vec<String>,
}

impl RuleSpec {
    /// A rule from raw iptables arguments.
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// The diagnostic rule: log every packet with `prefix` and keep traversing.
    #[must_use]
    pub fn log(prefix: &str) -> Self {
        Self::new(["-j", "LOG", "--log-prefix", prefix])
    }

    /// The iptables arguments for this rule.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for RuleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.args.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_rule_args() {
        let rule = RuleSpec::log("neutron-l3-agent-POSTROUTING");
        assert_eq!(
            rule.args(),
            ["-j", "LOG", "--log-prefix", "neutron-l3-agent-POSTROUTING"]
        );
        assert_eq!(
            rule.to_string(),
            "-j LOG --log-prefix neutron-l3-agent-POSTROUTING"
        );
    }

    #[test]
    fn rules_compare_by_args() {
        assert_eq!(RuleSpec::log("a"), RuleSpec::log("a"));
        assert_ne!(RuleSpec::log("a"), RuleSpec::log("b"));
        assert_ne!(RuleSpec::log("a"), RuleSpec::new(["-j", "ACCEPT"]));
    }
}
