//! C3 — Variable & Frame Graph: the resolution procedure from spec.md §4.3.

use ahash::{HashMap, HashMapExt};
use la_arena::Arena;

use crate::di::{ResolvedService, ServiceLookup};
use crate::diagnostic::BlueprintError;
use crate::graph::frame::{FrameId, FrameSlot, VariableBindings, VariableChain};
use crate::graph::variable::{VarId, Variable, VariableRead};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Grey,
    Black,
}

/// The mutable state threaded through one method's resolution pass:
/// variables and frames contributed so far, plus whatever new ones the
/// DI-aware instance frame provider (C6) mints along the way.
pub struct FrameGraph {
    pub variables: Arena<Variable>,
    pub frames: Arena<FrameSlot>,
}

impl FrameGraph {
    pub fn new() -> Self {
        Self {
            variables: Arena::new(),
            frames: Arena::new(),
        }
    }
}

impl Default for FrameGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// The result of resolving one method's frames: an emission-ordered list of
/// frame ids, and the identifier each variable in the graph should be
/// referenced by.
pub struct Resolution {
    pub order: Vec<FrameId>,
    pub bindings: VariableBindings,
    pub is_async: bool,
}

/// Run the deterministic resolution procedure described in spec.md §4.3.
///
/// `contributed` must already be sorted in contributor order (lower stage,
/// then lower insertion index — see [`FrameSlot::stage`] /
/// [`FrameSlot::insertion_index`]); ties are broken by that order, so the
/// caller establishing it correctly is what makes [`Resolution::order`]
/// deterministic across runs (Testable Property 1).
pub fn resolve(
    graph: &mut FrameGraph,
    contributed: Vec<FrameId>,
    parameters: Vec<VarId>,
    operation: &str,
    service_lookup: &mut dyn ServiceLookup,
) -> Result<Resolution, BlueprintError> {
    let mut chain = VariableChain::default();
    for p in &parameters {
        chain.push(*p);
    }

    let mut colors: HashMap<FrameId, Color> = HashMap::new();
    let mut order = Vec::new();
    let mut is_async = false;

    for frame_id in contributed {
        place(
            frame_id,
            graph,
            &mut chain,
            &mut colors,
            &mut order,
            &mut is_async,
            operation,
            service_lookup,
        )?;
    }

    let mut bindings = VariableBindings::default();
    for (id, var) in graph.variables.iter() {
        bindings.names.insert(id, var.name.clone());
    }

    Ok(Resolution {
        order,
        bindings,
        is_async,
    })
}

#[allow(clippy::too_many_arguments)]
fn place(
    frame_id: FrameId,
    graph: &mut FrameGraph,
    chain: &mut VariableChain,
    colors: &mut HashMap<FrameId, Color>,
    order: &mut Vec<FrameId>,
    is_async: &mut bool,
    operation: &str,
    service_lookup: &mut dyn ServiceLookup,
) -> Result<(), BlueprintError> {
    match colors.get(&frame_id) {
        Some(Color::Black) => return Ok(()),
        Some(Color::Grey) => {
            return Err(BlueprintError::PipelineCycle {
                operation: operation.to_string(),
                frame_path: format!("{frame_id:?} was revisited before being placed"),
            });
        }
        _ => {}
    }
    colors.insert(frame_id, Color::Grey);

    let reads = graph.frames[frame_id].body.find_variables(chain);
    for read in reads {
        resolve_read(read, graph, chain, colors, order, is_async, operation, service_lookup)?;
    }

    let slot = &graph.frames[frame_id];
    if slot.is_async {
        *is_async = true;
    }
    for created in slot.creates.clone() {
        chain.push(created);
    }

    colors.insert(frame_id, Color::Black);
    order.push(frame_id);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn resolve_read(
    read: VariableRead,
    graph: &mut FrameGraph,
    chain: &mut VariableChain,
    colors: &mut HashMap<FrameId, Color>,
    order: &mut Vec<FrameId>,
    is_async: &mut bool,
    operation: &str,
    service_lookup: &mut dyn ServiceLookup,
) -> Result<(), BlueprintError> {
    match read {
        VariableRead::ById(var_id) => {
            if chain.contains(var_id) {
                return Ok(());
            }
            let creator = graph.variables[var_id].creator;
            match creator {
                Some(producer) => {
                    place(
                        producer,
                        graph,
                        chain,
                        colors,
                        order,
                        is_async,
                        operation,
                        service_lookup,
                    )?;
                }
                None => {
                    // A parameter/field variable that wasn't in the initial
                    // chain is a caller bug, not a user-facing failure — it
                    // means the method builder forgot to seed it.
                    chain.push(var_id);
                }
            }
            Ok(())
        }
        VariableRead::ByType(type_id) => {
            if find_by_type(graph, chain, &type_id).is_some() {
                return Ok(());
            }
            match service_lookup.resolve(&type_id, operation, &mut graph.variables, &mut graph.frames)? {
                ResolvedService::Field(var_id) => {
                    chain.push(var_id);
                    Ok(())
                }
                ResolvedService::Frame(frame_id, var_id) => {
                    colors.insert(frame_id, Color::White);
                    place(
                        frame_id,
                        graph,
                        chain,
                        colors,
                        order,
                        is_async,
                        operation,
                        service_lookup,
                    )?;
                    debug_assert!(chain.contains(var_id));
                    Ok(())
                }
            }
        }
    }
}

fn find_by_type(
    graph: &FrameGraph,
    chain: &VariableChain,
    type_id: &blueprint_schema::TypeId,
) -> Option<VarId> {
    chain
        .placed
        .iter()
        .copied()
        .find(|id| &graph.variables[*id].type_id == type_id)
}
