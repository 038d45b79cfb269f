use std::collections::BTreeSet;

use tracing::{info, warn};

use super::host::{CanvasHost, EntityId, StructureSource};
use super::{Canvas, PanelId};

impl Canvas {
    /// The declared supertypes of `entity` may have changed.
    pub fn structural_change(&mut self, entity: &EntityId, host: &impl StructureSource) {
        let affected = self
            .panels
            .iter()
            .filter(|(_, panel)| panel.entity() == entity)
            .map(|(id, _)| id)
            .collect::<Vec<_>>();
        if affected.is_empty() {
            return;
        }

        for id in affected {
            self.rebuild_outgoing(id, host);
        }
        self.rebuild_all_incoming();
        self.request_repaint();
    }

    pub fn rebuild_all(&mut self, host: &impl StructureSource) {
        for id in self.panels.ids().to_vec() {
            self.rebuild_outgoing(id, host);
        }
        self.rebuild_all_incoming();
        self.request_repaint();
    }

    /// Point `source` at `target`, or drop the edge when it already points
    /// there. The source is briefly made Live so the edit lands on a mounted
    /// surface.
    pub fn toggle_extends(&mut self, source: PanelId, target: PanelId, host: &mut impl CanvasHost) {
        if source == target {
            return;
        }
        let Some(target_entity) = self.panels.get(target).map(|panel| panel.entity().clone()) else {
            return;
        };
        let zoom = self.viewport.current_zoom();
        let Some(panel) = self.panels.get_mut(source) else {
            return;
        };
        let source_entity = panel.entity().clone();
        let supertype = if panel.outgoing.contains(&target) {
            None
        } else {
            Some(&target_entity)
        };

        panel.to_live(host, zoom);
        let result = host.set_supertype(&source_entity, supertype);
        panel.to_frozen(host, zoom);
        if self.pointer.active == Some(source) {
            self.pointer.active = None;
        }

        match result {
            Ok(()) => {
                info!(
                    entity = %source_entity,
                    supertype = supertype.map(EntityId::as_str),
                    "updated supertype"
                );
                self.structural_change(&source_entity, &*host);
            }
            Err(err) => {
                warn!(entity = %source_entity, error = %format!("{err:#}"), "supertype edit failed");
                self.request_repaint();
            }
        }
    }

    /// Resolve the first declared supertype that is on the canvas.
    fn rebuild_outgoing(&mut self, id: PanelId, host: &impl StructureSource) {
        let Some(panel) = self.panels.get(id) else {
            return;
        };
        let target = host
            .supertypes(panel.entity())
            .iter()
            .find_map(|entity| {
                self.panels
                    .iter()
                    .find(|(other, candidate)| *other != id && candidate.entity() == entity)
                    .map(|(other, _)| other)
            });

        if let Some(panel) = self.panels.get_mut(id) {
            panel.outgoing = target.into_iter().collect();
        }
    }

    fn rebuild_incoming(&mut self, id: PanelId) {
        let incoming = self
            .panels
            .iter()
            .filter(|(_, panel)| panel.outgoing.contains(&id))
            .map(|(other, _)| other)
            .collect::<BTreeSet<_>>();
        if let Some(panel) = self.panels.get_mut(id) {
            panel.incoming = incoming;
        }
    }

    fn rebuild_all_incoming(&mut self) {
        for id in self.panels.ids().to_vec() {
            self.rebuild_incoming(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::canvas::host::{EntityId, StructureSource};
    use crate::canvas::test_support::{FakeHost, loaded_canvas};

    fn ids(canvas: &crate::canvas::Canvas, names: &[&str]) -> Vec<crate::canvas::PanelId> {
        names
            .iter()
            .map(|name| canvas.find(&EntityId::new(*name)).expect("panel loaded"))
            .collect()
    }

    #[test]
    fn unresolved_supertypes_are_omitted() {
        let mut host = FakeHost::default();
        host.declare("A", "java.lang.Thread");
        let canvas = loaded_canvas(&mut host, &["A", "B"]);
        let a = ids(&canvas, &["A"])[0];
        assert!(canvas.panel(a).expect("A").outgoing().is_empty());
    }

    #[test]
    fn incoming_sets_mirror_outgoing_edges() {
        let mut host = FakeHost::default();
        host.declare("A", "B");
        host.declare("C", "B");
        let canvas = loaded_canvas(&mut host, &["A", "B", "C"]);
        let [a, b, c] = ids(&canvas, &["A", "B", "C"])[..] else {
            panic!("three panels");
        };

        let incoming = canvas.panel(b).expect("B").incoming();
        assert_eq!(incoming.iter().copied().collect::<Vec<_>>(), {
            let mut expected = vec![a, c];
            expected.sort();
            expected
        });
        assert!(canvas.panel(a).expect("A").incoming().is_empty());
    }

    #[test]
    fn toggling_links_replaces_and_removes_but_never_doubles() {
        let mut host = FakeHost::default();
        let mut canvas = loaded_canvas(&mut host, &["A", "B", "C"]);
        let [a, b, c] = ids(&canvas, &["A", "B", "C"])[..] else {
            panic!("three panels");
        };

        canvas.toggle_extends(a, b, &mut host);
        assert_eq!(canvas.panel(a).expect("A").outgoing().iter().copied().collect::<Vec<_>>(), vec![b]);

        canvas.toggle_extends(a, c, &mut host);
        let outgoing = canvas.panel(a).expect("A").outgoing();
        assert_eq!(outgoing.len(), 1);
        assert!(outgoing.contains(&c));
        assert!(canvas.panel(b).expect("B").incoming().is_empty());
        assert!(canvas.panel(c).expect("C").incoming().contains(&a));

        canvas.toggle_extends(a, c, &mut host);
        assert!(canvas.panel(a).expect("A").outgoing().is_empty());
        assert!(host.supertypes(&EntityId::new("A")).is_empty());
        assert!(!canvas.panel(a).expect("A").is_live());
    }

    #[test]
    fn failed_edit_leaves_the_graph_alone() {
        let mut host = FakeHost::default();
        host.declare("A", "B");
        let mut canvas = loaded_canvas(&mut host, &["A", "B", "C"]);
        let [a, b, c] = ids(&canvas, &["A", "B", "C"])[..] else {
            panic!("three panels");
        };

        host.fail_edits = true;
        canvas.toggle_extends(a, c, &mut host);
        let outgoing = canvas.panel(a).expect("A").outgoing();
        assert_eq!(outgoing.iter().copied().collect::<Vec<_>>(), vec![b]);
        assert!(!canvas.panel(a).expect("A").is_live());
    }

    #[test]
    fn self_links_are_ignored() {
        let mut host = FakeHost::default();
        host.declare("A", "A");
        let mut canvas = loaded_canvas(&mut host, &["A"]);
        let a = ids(&canvas, &["A"])[0];
        assert!(canvas.panel(a).expect("A").outgoing().is_empty());

        canvas.toggle_extends(a, a, &mut host);
        assert!(canvas.panel(a).expect("A").outgoing().is_empty());
    }
}
