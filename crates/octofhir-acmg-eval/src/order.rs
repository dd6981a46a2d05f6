//! Dependency ordering for criteria and derived variables

use crate::definition::RuleSet;
use octofhir_acmg_ast::VariableRef;
use octofhir_acmg_diagnostics::{ACMG0102, ACMG0107, AcmgError, Result};
use std::collections::{BTreeSet, HashMap};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Reject cycles between derived variables
pub(crate) fn variable_dependencies(rules: &RuleSet) -> Result<()> {
    fn visit<'a>(
        name: &'a str,
        rules: &'a RuleSet,
        marks: &mut HashMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
    ) -> Result<()> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = stack.iter().position(|n| *n == name).unwrap_or(0);
                let mut cycle: Vec<&str> = stack[start..].to_vec();
                cycle.push(name);
                return Err(AcmgError::definition_in(
                    ACMG0107,
                    name,
                    format!("circular variable definition: {}", cycle.join(" -> ")),
                ));
            }
            None => {}
        }
        let Some(definition) = rules.var(name) else {
            return Ok(());
        };

        marks.insert(name, Mark::Visiting);
        stack.push(name);
        for var in definition.variables() {
            if rules.var(var.head()).is_some() {
                visit(var.head(), rules, marks, stack)?;
            }
        }
        stack.pop();
        marks.insert(name, Mark::Done);
        Ok(())
    }

    let mut marks = HashMap::new();
    let mut stack = Vec::new();
    for name in rules.vars().keys() {
        visit(name, rules, &mut marks, &mut stack)?;
    }
    Ok(())
}

/// Criterion codes a set of references depends on, following derived variables
fn referenced_criteria<'a>(
    refs: impl IntoIterator<Item = &'a VariableRef>,
    rules: &'a RuleSet,
    out: &mut BTreeSet<usize>,
    seen_vars: &mut BTreeSet<&'a str>,
) {
    for var in refs {
        let head = var.head();
        if let Some(index) = rules.criterion_index(head).filter(|_| var.is_dotted()) {
            out.insert(index);
        } else if let Some(definition) = rules.var(head) {
            if seen_vars.insert(head) {
                referenced_criteria(definition.variables(), rules, out, seen_vars);
            }
        }
    }
}

/// Evaluation order: every criterion after the criteria it reads, ties broken
/// by document order. Self references are allowed and read the running criterion.
pub(crate) fn criterion_order(rules: &RuleSet) -> Result<Vec<usize>> {
    let count = rules.len();
    let deps: Vec<BTreeSet<usize>> = rules
        .criteria()
        .enumerate()
        .map(|(index, criterion)| {
            let mut out = BTreeSet::new();
            referenced_criteria(criterion.variables(), rules, &mut out, &mut BTreeSet::new());
            out.remove(&index);
            out
        })
        .collect();

    let mut placed = vec![false; count];
    let mut order = Vec::with_capacity(count);
    while order.len() < count {
        let next = (0..count).find(|&i| !placed[i] && deps[i].iter().all(|&d| placed[d]));
        match next {
            Some(index) => {
                placed[index] = true;
                order.push(index);
            }
            None => {
                let codes: Vec<&str> = rules
                    .criteria()
                    .enumerate()
                    .filter(|(i, _)| !placed[*i])
                    .map(|(_, c)| c.code.as_str())
                    .collect();
                return Err(AcmgError::definition_in(
                    ACMG0102,
                    codes.first().copied().unwrap_or_default(),
                    format!("circular criterion references between {}", codes.join(", ")),
                ));
            }
        }
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use crate::definition::RuleSet;
    use octofhir_acmg_diagnostics::{ACMG0102, ACMG0107};
    use pretty_assertions::assert_eq;

    fn order(text: &str) -> Vec<String> {
        RuleSet::from_yaml_str(text)
            .unwrap()
            .ordered()
            .map(|c| c.code.clone())
            .collect()
    }

    #[test]
    fn test_document_order_without_references() {
        let text = "criteria:\n  PS1: {cond_strong: true}\n  PM1: {cond_moderate: true}\n  BP1: {cond_supporting: true}\n";
        assert_eq!(order(text), vec!["PS1", "PM1", "BP1"]);
    }

    #[test]
    fn test_reference_through_variable() {
        let text = r#"
vars:
  lof_met: { expr: "PVS1.match" }
criteria:
  PM4: { cond_moderate: "not lof_met" }
  PVS1: { cond_very_strong: true, cond_match: "PVS1.very_strong" }
"#;
        assert_eq!(order(text), vec!["PVS1", "PM4"]);
    }

    #[test]
    fn test_variable_cycle() {
        let text = "vars:\n  a: {expr: \"b + 1\"}\n  b: {expr: \"a + 1\"}\ncriteria:\n  PS1: {cond_strong: \"a > 0\"}\n";
        let err = RuleSet::from_yaml_str(text).unwrap_err();
        assert_eq!(err.code(), ACMG0107);
        assert!(err.to_string().contains("a -> b -> a"));
    }

    #[test]
    fn test_criterion_cycle_through_variable() {
        let text = r#"
vars:
  x: { expr: "PS2.match" }
criteria:
  PS1: { cond_strong: "x" }
  PS2: { cond_strong: "PS1.strong" }
"#;
        let err = RuleSet::from_yaml_str(text).unwrap_err();
        assert_eq!(err.code(), ACMG0102);
    }
}
