use crate::rules_based::{
    AttributeValue,
    ufc::{ComparisonOperator, Condition, ConditionCheck, RuleWire, TryParse},
};

use super::{eval_visitor::EvalRuleVisitor, subject::Subject};

impl RuleWire {
    pub(super) fn eval<V: EvalRuleVisitor>(&self, visitor: &mut V, subject: &Subject) -> bool {
        self.conditions.iter().all(|condition| match condition {
            TryParse::Parsed(condition) => condition.eval(visitor, subject),
            TryParse::ParseFailed(_) => false,
        })
    }
}

impl Condition {
    fn eval<V: EvalRuleVisitor>(&self, visitor: &mut V, subject: &Subject) -> bool {
        let attribute = subject.get_attribute(self.attribute.as_ref());
        let result = self.check.eval(attribute);
        visitor.on_condition_eval(self, attribute, result);
        result
    }
}

impl ConditionCheck {
    /// Check if `attribute` matches.
    fn eval(&self, attribute: Option<&AttributeValue>) -> bool {
        self.try_eval(attribute).unwrap_or(false)
    }

    /// Try applying `Operator` to the values, returning `None` if the operator cannot be applied.
    fn try_eval(&self, attribute: Option<&AttributeValue>) -> Option<bool> {
        let result = match self {
            ConditionCheck::Comparison {
                operator,
                comparand,
            } => {
                let attribute = attribute?.clone();
                let attribute = attribute.coerce_to_number()?;
                let ordering = attribute.partial_cmp(comparand)?;
                match operator {
                    ComparisonOperator::Gte => ordering.is_gt() || ordering.is_eq(),
                    ComparisonOperator::Gt => ordering.is_gt(),
                    ComparisonOperator::Lte => ordering.is_lt() || ordering.is_eq(),
                    ComparisonOperator::Lt => ordering.is_lt(),
                }
            }
            ConditionCheck::Regex {
                expected_match,
                regex,
            } => regex.is_match(attribute?.coerce_to_string()?.as_ref()) == *expected_match,
            ConditionCheck::Membership {
                expected_membership,
                values,
            } => {
                let s = attribute?.coerce_to_string()?;
                let s = s.as_ref();
                values.into_iter().any(|it| it.as_ref() == s) == *expected_membership
            }
            ConditionCheck::Null { expected_null } => {
                let is_present = attribute.is_some_and(|it| !it.is_null());
                let is_null = !is_present;
                is_null == *expected_null
            }
        };

        Some(result)
    }
}
