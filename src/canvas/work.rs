use std::collections::VecDeque;

use tracing::{debug, info};

use super::host::{CanvasHost, EntityId};
use super::{Canvas, PanelId};

/// One unit of deferred work, run on a later UI turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum WorkItem {
    AddPanel(EntityId),
    FinishLoading,
    Freeze(PanelId),
    Arrange,
    MarkLoaded,
}

#[derive(Debug, Default)]
pub(super) struct WorkQueue {
    items: VecDeque<WorkItem>,
}

impl WorkQueue {
    pub(super) fn push(&mut self, item: WorkItem) {
        self.items.push_back(item);
    }

    fn pop(&mut self) -> Option<WorkItem> {
        self.items.pop_front()
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(super) fn has_freeze(&self) -> bool {
        self.items
            .iter()
            .any(|item| matches!(item, WorkItem::Freeze(_)))
    }

    pub(super) fn forget(&mut self, id: PanelId) {
        self.items.retain(|item| *item != WorkItem::Freeze(id));
    }
}

impl Canvas {
    /// Queue the initial population. Nothing happens until the UI loop
    /// drains the queue with [`Canvas::run_pending_work`].
    pub fn begin_loading(&mut self, entities: impl IntoIterator<Item = EntityId>) {
        self.loading = true;
        self.loaded = 0;
        self.load_total = 0;
        for entity in entities {
            self.work.push(WorkItem::AddPanel(entity));
            self.load_total += 1;
        }
        self.work.push(WorkItem::FinishLoading);
        info!(total = self.load_total, "loading panels");
        self.request_repaint();
    }

    pub fn has_pending_work(&self) -> bool {
        !self.work.is_empty()
    }

    /// Run a single queued step. Returns whether more work remains.
    pub fn run_pending_work(&mut self, host: &mut impl CanvasHost) -> bool {
        let Some(item) = self.work.pop() else {
            return false;
        };

        match item {
            WorkItem::AddPanel(entity) => {
                if self.panels.find(&entity).is_none() {
                    self.create_panel(entity, host);
                }
                self.loaded += 1;
                debug!(loaded = self.loaded, total = self.load_total, "loaded panel");
            }
            WorkItem::FinishLoading => {
                self.rebuild_all(&*host);
                let live = self
                    .panels
                    .iter()
                    .filter(|(_, panel)| panel.is_live())
                    .map(|(id, _)| id)
                    .collect::<Vec<_>>();
                for id in live {
                    self.work.push(WorkItem::Freeze(id));
                }
                self.work.push(WorkItem::Arrange);
                self.work.push(WorkItem::MarkLoaded);
            }
            WorkItem::Freeze(id) => {
                let zoom = self.viewport.current_zoom();
                if let Some(panel) = self.panels.get_mut(id) {
                    panel.to_frozen(host, zoom);
                }
                if self.pointer.active == Some(id) {
                    self.pointer.active = None;
                }
            }
            WorkItem::Arrange => self.arrange_loaded(host),
            WorkItem::MarkLoaded => {
                self.loading = false;
                self.renumber_layers();
                info!(panels = self.panels.len(), "loading finished");
            }
        }

        self.request_repaint();
        !self.work.is_empty()
    }

    /// A fresh project gets a full layout. Otherwise only panels without a
    /// saved position are packed in.
    fn arrange_loaded(&mut self, host: &mut impl CanvasHost) {
        let unplaced = self
            .panels
            .iter()
            .filter(|(_, panel)| panel.needs_placement)
            .map(|(id, _)| id)
            .collect::<Vec<_>>();

        if unplaced.len() == self.panels.len() {
            self.relayout(host);
            return;
        }
        for id in unplaced {
            self.place_unplaced(id, host);
        }
    }
}
