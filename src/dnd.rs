//! Drag and drop privacy resolution.

use crate::config::{DndResolution, SameWindowTabDrop};
use crate::entity::{NodeId, WindowId};

/// State captured at drag start, consumed on drop or drag end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DndContext {
    pub source_node: NodeId,
    /// `None` when the drag has no tab context (e.g. from another application)
    pub source_is_private: Option<bool>,
    /// Window the drag started in, when known
    pub source_window: Option<WindowId>,
    /// A tab itself is being dragged (as opposed to a link or selection)
    pub is_tab_drag: bool,
}

/// Privacy flag for content dropped onto a target.
///
/// A missing source flag counts as not private.
pub fn resolve(mode: DndResolution, source_is_private: Option<bool>, target_is_private: bool) -> bool {
    let source = source_is_private.unwrap_or(false);
    match mode {
        DndResolution::SourceWins => source,
        DndResolution::TargetWins => target_is_private,
        DndResolution::Either => source || target_is_private,
    }
}

/// Whether a drop should be resolved at all.
///
/// Dropping a tab within its own window is the host's tab reordering; by
/// default it is left alone.
pub fn should_resolve(
    policy: SameWindowTabDrop,
    is_tab_drag: bool,
    source_window: Option<WindowId>,
    target_window: WindowId,
) -> bool {
    if !is_tab_drag || source_window != Some(target_window) {
        return true;
    }
    policy == SameWindowTabDrop::Resolve
}
