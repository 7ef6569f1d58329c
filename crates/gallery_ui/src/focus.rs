//! Focus containment for modal scopes
//!
//! Each open modal pushes a scope. Only the top scope traps Tab. Focus moves
//! that depend on the modal being rendered (initial focus, restoring focus on
//! close) are queued and applied by [`FocusController::flush`], which the host
//! calls after each render.

use gallery_core::ElementId;

/// Element as reported by [`FocusHost::focusable_within`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusableNode {
    pub id: ElementId,
    /// Links, buttons, inputs and other natively interactive elements
    pub interactive: bool,
    pub disabled: bool,
    pub hidden: bool,
    pub tab_index: i32,
}

impl FocusableNode {
    /// Interactive control in default tab order
    pub fn control(id: u64) -> Self {
        Self {
            id: ElementId(id),
            interactive: true,
            disabled: false,
            hidden: false,
            tab_index: 0,
        }
    }

    pub fn is_focusable(&self) -> bool {
        self.interactive && !self.disabled && !self.hidden && self.tab_index >= 0
    }
}

/// Host document access
pub trait FocusHost {
    fn active_element(&self) -> Option<ElementId>;
    fn focus(&mut self, id: ElementId);
    /// Still part of the rendered document
    fn is_attached(&self, id: ElementId) -> bool;
    /// Descendants of `container` in document order
    fn focusable_within(&self, container: ElementId) -> Vec<FocusableNode>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u64);

#[derive(Debug)]
struct FocusScope {
    id: ScopeId,
    container: ElementId,
    restore_to: Option<ElementId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingFocus {
    /// Move into a freshly rendered scope
    Enter {
        container: ElementId,
        initial: Option<ElementId>,
    },
    Restore {
        target: Option<ElementId>,
        fallback: Option<ElementId>,
    },
}

#[derive(Debug, Default)]
pub struct FocusController {
    scopes: Vec<FocusScope>,
    pending: Vec<PendingFocus>,
    next_id: u64,
}

/// Focusable elements in tab order: positive `tab_index` ascending, then document order
fn tab_order(host: &dyn FocusHost, container: ElementId) -> Vec<ElementId> {
    let mut nodes: Vec<FocusableNode> = host
        .focusable_within(container)
        .into_iter()
        .filter(FocusableNode::is_focusable)
        .collect();
    nodes.sort_by_key(|n| (n.tab_index == 0, n.tab_index));
    nodes.into_iter().map(|n| n.id).collect()
}

impl FocusController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_trapping(&self) -> bool {
        !self.scopes.is_empty()
    }

    /// Container of the scope currently trapping Tab
    pub fn top_container(&self) -> Option<ElementId> {
        self.scopes.last().map(|s| s.container)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Push a scope; focus moves into it on the next `flush`.
    ///
    /// On deactivation focus returns to `restore_to`, or to the element
    /// focused now when none is given.
    pub fn activate(
        &mut self,
        host: &dyn FocusHost,
        container: ElementId,
        initial: Option<ElementId>,
        restore_to: Option<ElementId>,
    ) -> ScopeId {
        let id = ScopeId(self.next_id);
        self.next_id += 1;

        let restore_to = restore_to.or_else(|| host.active_element());
        self.scopes.push(FocusScope {
            id,
            container,
            restore_to,
        });
        self.pending.push(PendingFocus::Enter { container, initial });

        tracing::debug!(?id, ?container, ?restore_to, depth = self.scopes.len(), "Focus scope activated");
        id
    }

    /// Pop a scope and queue focus restoration.
    ///
    /// Restores to the scope's restore target if it is still attached,
    /// otherwise to `fallback`. Returns `false` for an unknown scope.
    pub fn deactivate(&mut self, scope: ScopeId, fallback: Option<ElementId>) -> bool {
        let Some(pos) = self.scopes.iter().position(|s| s.id == scope) else {
            return false;
        };
        let was_top = pos + 1 == self.scopes.len();
        let removed = self.scopes.remove(pos);

        if was_top {
            self.pending.push(PendingFocus::Restore {
                target: removed.restore_to,
                fallback,
            });
        } else if let Some(above) = self.scopes.get_mut(pos) {
            // The scope above now returns focus to where this one would have
            above.restore_to = removed.restore_to;
        }

        tracing::debug!(?scope, depth = self.scopes.len(), "Focus scope deactivated");
        true
    }

    /// Handle Tab / Shift+Tab inside the top scope.
    ///
    /// Returns the element focused, or `None` when no scope is trapping and
    /// the host should let the key through.
    pub fn handle_tab(&mut self, host: &mut dyn FocusHost, shift: bool) -> Option<ElementId> {
        let container = self.top_container()?;
        let order = tab_order(host, container);

        let target = if order.is_empty() {
            container
        } else {
            let current = host
                .active_element()
                .and_then(|active| order.iter().position(|&id| id == active));
            let last = order.len() - 1;
            let index = match (current, shift) {
                // Focus outside the scope (or on the container itself) is pulled in
                (None, false) => 0,
                (None, true) => last,
                (Some(i), false) if i == last => 0,
                (Some(i), false) => i + 1,
                (Some(0), true) => last,
                (Some(i), true) => i - 1,
            };
            order[index]
        };

        host.focus(target);
        Some(target)
    }

    /// Post-render hook: apply queued focus moves in order
    pub fn flush(&mut self, host: &mut dyn FocusHost) -> Vec<ElementId> {
        let mut applied = Vec::new();
        for pending in std::mem::take(&mut self.pending) {
            let target = match pending {
                PendingFocus::Enter { container, initial } => initial
                    .filter(|&id| host.is_attached(id))
                    .or_else(|| tab_order(host, container).first().copied())
                    .or(Some(container)),
                PendingFocus::Restore { target, fallback } => target
                    .filter(|&id| host.is_attached(id))
                    .or_else(|| fallback.filter(|&id| host.is_attached(id))),
            };

            if let Some(target) = target {
                host.focus(target);
                applied.push(target);
            } else {
                tracing::debug!(?pending, "No focus target attached");
            }
        }
        applied
    }
}
