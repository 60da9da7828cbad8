//! Instant evaluation
//!
//! Direct recursive interpreter for block trees, following the textbook
//! semantics of each operator. Primitive recursion is deliberately
//! naive: evaluating at depth `n` performs `n` nested self-evaluations
//! with no memoization, so the stepping view (the `step` module) sees
//! the full call sequence.

use tracing::trace;

use crate::error::{Error, Result};
use crate::registry::{PARAM_INDEX, PARAM_INNER_COUNT, SLOT_BASE_CASE, SLOT_DEFINITION, SLOT_F, SLOT_RECURSIVE_CASE};
use crate::types::{BlockKind, BlockNode, Value};

/// Highest candidate tried by minimization before giving up.
pub const MINIMIZATION_BOUND: Value = 9999;

fn required_child<'a>(node: &'a BlockNode, slot_name: &str) -> Result<&'a BlockNode> {
    node.slot(slot_name)
        .and_then(|s| s.child.as_ref())
        .ok_or_else(|| Error::IncompleteDefinition(slot_name.to_string()))
}

/// Evaluate a block tree on the given inputs.
///
/// Stack-recursive; deep primitive-recursion nesting recurses deeply.
/// The `step` module drives the same semantics off an explicit frame
/// stack when per-node observation or depth robustness is needed.
pub fn evaluate(node: &BlockNode, inputs: &[Value]) -> Result<Value> {
    let result = match node.kind {
        BlockKind::Zero => Ok(0),

        BlockKind::Successor => {
            if inputs.len() != 1 {
                return Err(Error::ArityMismatch {
                    kind: "Successor",
                    expected: 1,
                    actual: inputs.len(),
                });
            }
            Ok(inputs[0] + 1)
        }

        BlockKind::Projection => {
            if inputs.is_empty() {
                return Err(Error::ArityMismatch {
                    kind: "Projection",
                    expected: 1,
                    actual: 0,
                });
            }
            let i = node.param(PARAM_INDEX).unwrap_or(1);
            if i < 1 || i as usize > inputs.len() {
                return Err(Error::ParameterOutOfRange {
                    name: PARAM_INDEX.to_string(),
                    value: i,
                    actual: inputs.len(),
                });
            }
            Ok(inputs[i as usize - 1])
        }

        BlockKind::Composition => {
            let m = node.param(PARAM_INNER_COUNT).unwrap_or(1).max(1) as usize;
            let f = required_child(node, SLOT_F)?;
            let mut g_results = Vec::with_capacity(m);
            for k in 1..=m {
                let slot_name = format!("g{}", k);
                let g = required_child(node, &slot_name)?;
                g_results.push(evaluate(g, inputs)?);
            }
            evaluate(f, &g_results)
        }

        BlockKind::PrimitiveRecursion => {
            if inputs.is_empty() {
                return Err(Error::ArityMismatch {
                    kind: "Primitive Recursion",
                    expected: 1,
                    actual: 0,
                });
            }
            let n = inputs[inputs.len() - 1];
            let rest = &inputs[..inputs.len() - 1];
            if n <= 0 {
                evaluate(required_child(node, SLOT_BASE_CASE)?, rest)
            } else {
                let rec = required_child(node, SLOT_RECURSIVE_CASE)?;
                let mut decremented = rest.to_vec();
                decremented.push(n - 1);
                let prior = evaluate(node, &decremented)?;
                decremented.push(prior);
                evaluate(rec, &decremented)
            }
        }

        BlockKind::Minimization => {
            let f = required_child(node, SLOT_F)?;
            let mut args = inputs.to_vec();
            args.push(0);
            let search_pos = args.len() - 1;
            let mut found = None;
            for n in 0..=MINIMIZATION_BOUND {
                args[search_pos] = n;
                if evaluate(f, &args)? == 0 {
                    found = Some(n);
                    break;
                }
            }
            found.ok_or(Error::DivergenceBound(MINIMIZATION_BOUND))
        }

        BlockKind::Custom => evaluate(required_child(node, SLOT_DEFINITION)?, inputs),
    };

    if let Ok(value) = result {
        trace!(node = %node.id, kind = %node.kind, value, "evaluated");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arity;
    use crate::registry::default_node;
    use crate::tree::attach;

    fn projection(i: i64) -> BlockNode {
        let mut node = default_node(BlockKind::Projection);
        node.params[0].value = i;
        node
    }

    fn composition(m: i64, f: BlockNode, gs: Vec<BlockNode>) -> BlockNode {
        let mut node = default_node(BlockKind::Composition);
        node.params[0].value = m;
        node.slots = crate::registry::dynamic_slots(&node).unwrap();
        node.slots[0].child = Some(f);
        for (k, g) in gs.into_iter().enumerate() {
            node.slots[k + 1].child = Some(g);
        }
        node
    }

    fn primitive_recursion(base: BlockNode, rec: BlockNode) -> BlockNode {
        let mut node = default_node(BlockKind::PrimitiveRecursion);
        node.slots[0].child = Some(base);
        node.slots[1].child = Some(rec);
        node
    }

    /// h(x, n) = x + n
    fn addition() -> BlockNode {
        primitive_recursion(
            projection(1),
            composition(1, default_node(BlockKind::Successor), vec![projection(3)]),
        )
    }

    /// pred(n) = n - 1, truncated at 0
    fn predecessor() -> BlockNode {
        primitive_recursion(default_node(BlockKind::Zero), projection(1))
    }

    /// sub(x, n) = x - n, truncated at 0
    fn subtraction() -> BlockNode {
        primitive_recursion(
            projection(1),
            composition(1, predecessor(), vec![projection(3)]),
        )
    }

    #[test]
    fn test_zero_ignores_inputs() {
        assert_eq!(evaluate(&default_node(BlockKind::Zero), &[9, 9]).unwrap(), 0);
        assert_eq!(evaluate(&default_node(BlockKind::Zero), &[]).unwrap(), 0);
    }

    #[test]
    fn test_successor_requires_one_input() {
        let succ = default_node(BlockKind::Successor);
        assert_eq!(evaluate(&succ, &[5]).unwrap(), 6);
        assert!(matches!(
            evaluate(&succ, &[]).unwrap_err(),
            Error::ArityMismatch { actual: 0, .. }
        ));
        assert!(matches!(
            evaluate(&succ, &[1, 2]).unwrap_err(),
            Error::ArityMismatch { actual: 2, .. }
        ));
    }

    #[test]
    fn test_projection_selects_one_based() {
        assert_eq!(evaluate(&projection(2), &[7, 9, 2]).unwrap(), 9);
        assert!(matches!(
            evaluate(&projection(4), &[7, 9, 2]).unwrap_err(),
            Error::ParameterOutOfRange { value: 4, .. }
        ));
        assert!(matches!(
            evaluate(&projection(0), &[7, 9, 2]).unwrap_err(),
            Error::ParameterOutOfRange { value: 0, .. }
        ));
    }

    #[test]
    fn test_composition_applies_inner_then_outer() {
        // f(g1(x), g2(x)) with f = addition, g1 = P1, g2 = P1: x + x
        let node = composition(2, addition(), vec![projection(1), projection(1)]);
        assert_eq!(evaluate(&node, &[4]).unwrap(), 8);
    }

    #[test]
    fn test_composition_missing_slot_named() {
        let node = composition(2, addition(), vec![projection(1)]);
        assert_eq!(
            evaluate(&node, &[4]).unwrap_err(),
            Error::IncompleteDefinition("g2".to_string())
        );
    }

    #[test]
    fn test_primitive_recursion_addition() {
        assert_eq!(evaluate(&addition(), &[3, 4]).unwrap(), 7);
        assert_eq!(evaluate(&addition(), &[3, 0]).unwrap(), 3);
        assert_eq!(evaluate(&addition(), &[0, 0]).unwrap(), 0);
    }

    #[test]
    fn test_primitive_recursion_missing_cases() {
        let mut node = default_node(BlockKind::PrimitiveRecursion);
        node.slots[1].child = Some(projection(3));
        assert_eq!(
            evaluate(&node, &[2, 0]).unwrap_err(),
            Error::IncompleteDefinition(SLOT_BASE_CASE.to_string())
        );
        let mut node = default_node(BlockKind::PrimitiveRecursion);
        node.slots[0].child = Some(projection(1));
        assert_eq!(
            evaluate(&node, &[2, 3]).unwrap_err(),
            Error::IncompleteDefinition(SLOT_RECURSIVE_CASE.to_string())
        );
    }

    #[test]
    fn test_minimization_finds_least_zero() {
        // least n with sub(5, n) = 0 is 5
        let mut node = default_node(BlockKind::Minimization);
        node.slots[0].child = Some(subtraction());
        assert_eq!(evaluate(&node, &[5]).unwrap(), 5);
    }

    #[test]
    fn test_minimization_divergence_bound() {
        // f(x, n) = n + 1, never zero
        let f = composition(1, default_node(BlockKind::Successor), vec![projection(2)]);
        let mut node = default_node(BlockKind::Minimization);
        node.slots[0].child = Some(f);
        assert_eq!(
            evaluate(&node, &[5]).unwrap_err(),
            Error::DivergenceBound(MINIMIZATION_BOUND)
        );
    }

    #[test]
    fn test_custom_forwards_inputs() {
        let mut wrapper = default_node(BlockKind::Custom);
        assert_eq!(
            evaluate(&wrapper, &[1, 2]).unwrap_err(),
            Error::IncompleteDefinition(SLOT_DEFINITION.to_string())
        );
        wrapper.slots[0].child = Some(addition());
        assert_eq!(evaluate(&wrapper, &[1, 2]).unwrap(), 3);
    }

    #[test]
    fn test_failed_evaluation_leaves_tree_usable() {
        let mut root = default_node(BlockKind::Minimization);
        arity::propagate(&mut root, 1);
        assert!(evaluate(&root, &[1]).is_err());
        // tree still accepts edits and evaluates afterwards
        let root = attach(&root, root.id, SLOT_F, subtraction(), 1).unwrap();
        assert_eq!(evaluate(&root, &[0]).unwrap(), 0);
    }
}
