//! Step-by-step evaluation
//!
//! Same semantics as [`crate::eval::evaluate`], driven off an explicit
//! frame stack and exposed as a pull iterator: each item is the
//! completion of one node-evaluation, in post-order of the dynamic call
//! tree, so a visualizer can highlight nodes as their results arrive.
//!
//! The event sequence is deterministic for a fixed tree and inputs. A
//! [`HaltHandle`] cancels cooperatively: it is observed before the next
//! pending step, never mid-computation, and ends the iterator without a
//! final result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::trace;

use crate::error::{Error, Result};
use crate::eval::MINIMIZATION_BOUND;
use crate::registry::{PARAM_INDEX, PARAM_INNER_COUNT, SLOT_BASE_CASE, SLOT_DEFINITION, SLOT_F, SLOT_RECURSIVE_CASE};
use crate::types::{BlockId, BlockKind, BlockNode, Value};

/// One completed node-evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepEvent {
    pub node: BlockId,
    pub kind: BlockKind,
    pub result: Value,
}

/// Cooperative cancellation flag for a [`StepTrace`].
#[derive(Debug, Clone, Default)]
pub struct HaltHandle(Arc<AtomicBool>);

impl HaltHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect at the next pending step.
    pub fn halt(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_halted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

enum FrameState {
    /// Node not yet examined.
    Start,
    /// Child result becomes this node's result (custom body, primitive
    /// recursion cases).
    Forward,
    /// Composition: collecting `g1..gm` results, then the outer call.
    Gather {
        m: usize,
        next: usize,
        results: Vec<Value>,
    },
    /// Composition: outer `f` call pending.
    Outer,
    /// Primitive recursion: self-evaluation on the decremented inputs
    /// pending; the recursive case runs on its result.
    Prior { decremented: Vec<Value> },
    /// Minimization: trying candidate `n`.
    Search { n: Value },
}

struct Frame<'a> {
    node: &'a BlockNode,
    inputs: Vec<Value>,
    state: FrameState,
}

impl<'a> Frame<'a> {
    fn new(node: &'a BlockNode, inputs: Vec<Value>) -> Self {
        Self {
            node,
            inputs,
            state: FrameState::Start,
        }
    }
}

fn required_child<'a>(node: &'a BlockNode, slot_name: &str) -> Result<&'a BlockNode> {
    node.slot(slot_name)
        .and_then(|s| s.child.as_ref())
        .ok_or_else(|| Error::IncompleteDefinition(slot_name.to_string()))
}

/// Begin a step trace over `node` with the given inputs.
pub fn step<'a>(node: &'a BlockNode, inputs: &[Value]) -> StepTrace<'a> {
    step_with_halt(node, inputs, HaltHandle::new())
}

/// Begin a step trace with an externally owned halt handle.
pub fn step_with_halt<'a>(node: &'a BlockNode, inputs: &[Value], halt: HaltHandle) -> StepTrace<'a> {
    StepTrace {
        stack: vec![Frame::new(node, inputs.to_vec())],
        last: None,
        final_result: None,
        halt,
        done: false,
    }
}

/// Pull iterator over step events.
///
/// Yields `Ok(StepEvent)` per completed node-evaluation; an `Err` item
/// reports an evaluation failure and ends the trace.
pub struct StepTrace<'a> {
    stack: Vec<Frame<'a>>,
    /// Result of the most recently completed frame, consumed by its
    /// parent on resume.
    last: Option<Value>,
    final_result: Option<Value>,
    halt: HaltHandle,
    done: bool,
}

impl<'a> StepTrace<'a> {
    /// The root result, available once the trace ran to completion.
    pub fn final_result(&self) -> Option<Value> {
        self.final_result
    }

    pub fn halt_handle(&self) -> HaltHandle {
        self.halt.clone()
    }

    /// Pop the current frame and report its completion.
    fn complete(&mut self, value: Value) -> StepEvent {
        let frame = self.stack.pop().expect("completing frame exists");
        self.last = Some(value);
        if self.stack.is_empty() {
            self.final_result = Some(value);
            self.done = true;
        }
        trace!(node = %frame.node.id, kind = %frame.node.kind, value, "step");
        StepEvent {
            node: frame.node.id,
            kind: frame.node.kind,
            result: value,
        }
    }

    /// Advance the machine until one node-evaluation completes.
    fn advance(&mut self) -> Result<StepEvent> {
        loop {
            // Decide the transition with a shared borrow, then apply it.
            let frame = self.stack.last().expect("non-empty stack");
            let node = frame.node;

            match &frame.state {
                FrameState::Start => match node.kind {
                    BlockKind::Zero => return Ok(self.complete(0)),

                    BlockKind::Successor => {
                        if frame.inputs.len() != 1 {
                            return Err(Error::ArityMismatch {
                                kind: "Successor",
                                expected: 1,
                                actual: frame.inputs.len(),
                            });
                        }
                        let value = frame.inputs[0] + 1;
                        return Ok(self.complete(value));
                    }

                    BlockKind::Projection => {
                        if frame.inputs.is_empty() {
                            return Err(Error::ArityMismatch {
                                kind: "Projection",
                                expected: 1,
                                actual: 0,
                            });
                        }
                        let i = node.param(PARAM_INDEX).unwrap_or(1);
                        if i < 1 || i as usize > frame.inputs.len() {
                            return Err(Error::ParameterOutOfRange {
                                name: PARAM_INDEX.to_string(),
                                value: i,
                                actual: frame.inputs.len(),
                            });
                        }
                        let value = frame.inputs[i as usize - 1];
                        return Ok(self.complete(value));
                    }

                    BlockKind::Composition => {
                        let m = node.param(PARAM_INNER_COUNT).unwrap_or(1).max(1) as usize;
                        required_child(node, SLOT_F)?;
                        let g1 = required_child(node, "g1")?;
                        let inputs = frame.inputs.clone();
                        let frame = self.stack.last_mut().expect("non-empty stack");
                        frame.state = FrameState::Gather {
                            m,
                            next: 1,
                            results: Vec::with_capacity(m),
                        };
                        self.stack.push(Frame::new(g1, inputs));
                    }

                    BlockKind::PrimitiveRecursion => {
                        if frame.inputs.is_empty() {
                            return Err(Error::ArityMismatch {
                                kind: "Primitive Recursion",
                                expected: 1,
                                actual: 0,
                            });
                        }
                        let n = *frame.inputs.last().expect("non-empty inputs");
                        let rest = frame.inputs[..frame.inputs.len() - 1].to_vec();
                        if n <= 0 {
                            let base = required_child(node, SLOT_BASE_CASE)?;
                            let frame = self.stack.last_mut().expect("non-empty stack");
                            frame.state = FrameState::Forward;
                            self.stack.push(Frame::new(base, rest));
                        } else {
                            required_child(node, SLOT_RECURSIVE_CASE)?;
                            let mut decremented = rest;
                            decremented.push(n - 1);
                            let frame = self.stack.last_mut().expect("non-empty stack");
                            frame.state = FrameState::Prior {
                                decremented: decremented.clone(),
                            };
                            self.stack.push(Frame::new(node, decremented));
                        }
                    }

                    BlockKind::Minimization => {
                        let f = required_child(node, SLOT_F)?;
                        let mut args = frame.inputs.clone();
                        args.push(0);
                        let frame = self.stack.last_mut().expect("non-empty stack");
                        frame.state = FrameState::Search { n: 0 };
                        self.stack.push(Frame::new(f, args));
                    }

                    BlockKind::Custom => {
                        let body = required_child(node, SLOT_DEFINITION)?;
                        let inputs = frame.inputs.clone();
                        let frame = self.stack.last_mut().expect("non-empty stack");
                        frame.state = FrameState::Forward;
                        self.stack.push(Frame::new(body, inputs));
                    }
                },

                FrameState::Forward => {
                    let value = self.last.take().expect("child result pending");
                    return Ok(self.complete(value));
                }

                FrameState::Outer => {
                    let value = self.last.take().expect("outer result pending");
                    return Ok(self.complete(value));
                }

                FrameState::Gather { m, next, results } => {
                    let (m, done_count) = (*m, *next);
                    let mut results = results.clone();
                    results.push(self.last.take().expect("inner result pending"));
                    if done_count < m {
                        let slot_name = format!("g{}", done_count + 1);
                        let g = required_child(node, &slot_name)?;
                        let inputs = frame.inputs.clone();
                        let frame = self.stack.last_mut().expect("non-empty stack");
                        frame.state = FrameState::Gather {
                            m,
                            next: done_count + 1,
                            results: results.clone(),
                        };
                        self.stack.push(Frame::new(g, inputs));
                    } else {
                        let f = required_child(node, SLOT_F)?;
                        let frame = self.stack.last_mut().expect("non-empty stack");
                        frame.state = FrameState::Outer;
                        self.stack.push(Frame::new(f, results));
                    }
                }

                FrameState::Prior { decremented } => {
                    let prior = self.last.take().expect("prior result pending");
                    let rec = required_child(node, SLOT_RECURSIVE_CASE)?;
                    let mut args = decremented.clone();
                    args.push(prior);
                    let frame = self.stack.last_mut().expect("non-empty stack");
                    frame.state = FrameState::Forward;
                    self.stack.push(Frame::new(rec, args));
                }

                FrameState::Search { n } => {
                    let n = *n;
                    let candidate_result = self.last.take().expect("candidate result pending");
                    if candidate_result == 0 {
                        return Ok(self.complete(n));
                    }
                    if n >= MINIMIZATION_BOUND {
                        return Err(Error::DivergenceBound(MINIMIZATION_BOUND));
                    }
                    let f = required_child(node, SLOT_F)?;
                    let mut args = frame.inputs.clone();
                    args.push(n + 1);
                    let frame = self.stack.last_mut().expect("non-empty stack");
                    frame.state = FrameState::Search { n: n + 1 };
                    self.stack.push(Frame::new(f, args));
                }
            }
        }
    }
}

impl<'a> Iterator for StepTrace<'a> {
    type Item = Result<StepEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.halt.is_halted() {
            self.done = true;
            return None;
        }
        match self.advance() {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
