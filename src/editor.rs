use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::heightfield::HeightGrid;

/// A rectangular block of grid cells
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub x: i64,
    pub z: i64,
    pub width: usize,
    pub depth: usize,
}

impl Patch {
    pub fn new(x: i64, z: i64, width: usize, depth: usize) -> Self {
        Patch { x, z, width, depth }
    }
}

/// A discrete terrain edit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditCommand {
    /// Add `delta` to every cell of the patch
    Raise { patch: Patch, delta: f32 },
    /// Subtract `delta` from every cell of the patch
    Lower { patch: Patch, delta: f32 },
    /// Restore the patch to the heights the editor was built with
    Reset { patch: Patch },
    /// Set every cell of the patch to `elevation`
    Paint { patch: Patch, elevation: f32 },
}

impl EditCommand {
    pub fn patch(&self) -> Patch {
        match *self {
            EditCommand::Raise { patch, .. }
            | EditCommand::Lower { patch, .. }
            | EditCommand::Reset { patch }
            | EditCommand::Paint { patch, .. } => patch,
        }
    }
}

/// Trigger name to edit command table
///
/// Replaces keyboard listeners: the embedding application forwards a trigger
/// name (a key, a button id) and gets back the edit bound to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditBindings {
    bindings: BTreeMap<String, EditCommand>,
}

impl EditBindings {
    /// The island demo's key layout around a centre cell
    ///
    /// * `u` raises, `j` lowers, `r` resets a `size` x `size` patch at
    ///   `center` by `delta`; `p` paints a wider plateau at `plateau` height.
    pub fn island_defaults(center: (i64, i64), size: usize, delta: f32, plateau: f32) -> Self {
        let patch = Patch::new(center.0, center.1, size, size);
        let wide = Patch::new(center.0 - 4, center.1 - 4, 8, 8);
        let mut bindings = EditBindings::default();
        bindings.bind("u", EditCommand::Raise { patch, delta });
        bindings.bind("j", EditCommand::Lower { patch, delta });
        bindings.bind("r", EditCommand::Reset { patch });
        bindings.bind(
            "p",
            EditCommand::Paint {
                patch: wide,
                elevation: plateau,
            },
        );
        bindings
    }

    pub fn bind(&mut self, trigger: impl Into<String>, command: EditCommand) {
        self.bindings.insert(trigger.into(), command);
    }

    pub fn command(&self, trigger: &str) -> Option<&EditCommand> {
        self.bindings.get(trigger)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Applies edit commands to a height grid owned by the caller
///
/// Keeps a snapshot of the grid it was created from so `Reset` has a base
/// reading to restore.
#[derive(Debug, Clone)]
pub struct HeightfieldEditor {
    base: HeightGrid,
}

impl HeightfieldEditor {
    pub fn new(base: &HeightGrid) -> Self {
        HeightfieldEditor { base: base.clone() }
    }

    pub fn base(&self) -> &HeightGrid {
        &self.base
    }

    /// Apply a single edit
    ///
    /// The patch is read, transformed and written back in one bounded write;
    /// on error the grid is left as it was.
    pub fn apply(&self, grid: &mut HeightGrid, command: &EditCommand) -> Result<()> {
        let patch = command.patch();
        let values = match *command {
            EditCommand::Raise { delta, .. } => {
                let mut values = grid.patch(patch.x, patch.z, patch.width, patch.depth)?;
                values.iter_mut().for_each(|h| *h += delta);
                values
            }
            EditCommand::Lower { delta, .. } => {
                let mut values = grid.patch(patch.x, patch.z, patch.width, patch.depth)?;
                values.iter_mut().for_each(|h| *h -= delta);
                values
            }
            EditCommand::Reset { .. } => {
                self.base
                    .patch(patch.x, patch.z, patch.width, patch.depth)?
            }
            EditCommand::Paint { elevation, .. } => {
                let mut values = grid.patch(patch.x, patch.z, patch.width, patch.depth)?;
                values.fill(elevation);
                values
            }
        };
        grid.set_height_patch(patch.x, patch.z, patch.width, patch.depth, &values)?;
        debug!("applied {command:?}");
        Ok(())
    }

    /// Look up `trigger` and apply its edit
    ///
    /// Returns `Ok(false)` when nothing is bound to the trigger.
    pub fn handle_trigger(
        &self,
        bindings: &EditBindings,
        grid: &mut HeightGrid,
        trigger: &str,
    ) -> Result<bool> {
        let Some(command) = bindings.command(trigger) else {
            debug!("no edit bound to trigger {trigger:?}");
            return Ok(false);
        };
        if let Err(e) = self.apply(grid, command) {
            warn!("edit for trigger {trigger:?} rejected: {e}");
            return Err(e);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TerrainError;

    #[test]
    fn test_raise_four_times_accumulates() {
        let mut grid = HeightGrid::new(256, 256, 7.0).unwrap();
        let editor = HeightfieldEditor::new(&grid);
        let raise = EditCommand::Raise {
            patch: Patch::new(128, 128, 2, 2),
            delta: 10.0,
        };

        for _ in 0..4 {
            editor.apply(&mut grid, &raise).unwrap();
        }

        for (x, z) in [(128, 128), (128, 129), (129, 128), (129, 129)] {
            assert_eq!(grid.get_height(x, z).unwrap(), 47.0);
        }
        assert_eq!(grid.get_height(130, 128).unwrap(), 7.0);
        assert_eq!(grid.get_height(127, 127).unwrap(), 7.0);
    }

    #[test]
    fn test_lower_then_reset_restores_base() {
        let mut grid = HeightGrid::new(16, 16, 0.0).unwrap();
        grid.set_height(5, 5, 3.0).unwrap();
        let editor = HeightfieldEditor::new(&grid);
        let patch = Patch::new(4, 4, 2, 2);

        editor
            .apply(&mut grid, &EditCommand::Lower { patch, delta: 10.0 })
            .unwrap();
        assert_eq!(grid.get_height(5, 5).unwrap(), -7.0);
        assert_eq!(grid.get_height(4, 4).unwrap(), -10.0);

        editor.apply(&mut grid, &EditCommand::Reset { patch }).unwrap();
        assert_eq!(&grid, editor.base());
    }

    #[test]
    fn test_reset_on_untouched_grid_is_noop() {
        let mut grid = HeightGrid::new(8, 8, 2.5).unwrap();
        let editor = HeightfieldEditor::new(&grid);
        editor
            .apply(
                &mut grid,
                &EditCommand::Reset {
                    patch: Patch::new(0, 0, 8, 8),
                },
            )
            .unwrap();
        assert_eq!(&grid, editor.base());
    }

    #[test]
    fn test_paint_sets_constant_region() {
        let mut grid = HeightGrid::new(10, 10, 1.0).unwrap();
        let editor = HeightfieldEditor::new(&grid);
        let patch = Patch::new(2, 3, 4, 5);
        editor
            .apply(
                &mut grid,
                &EditCommand::Paint {
                    patch,
                    elevation: 60.0,
                },
            )
            .unwrap();

        let painted = grid.patch(2, 3, 4, 5).unwrap();
        assert!(painted.iter().all(|h| *h == 60.0));
        assert_eq!(grid.get_height(1, 3).unwrap(), 1.0);
        assert_eq!(grid.get_height(6, 3).unwrap(), 1.0);
    }

    #[test]
    fn test_out_of_bounds_edit_leaves_grid_untouched() {
        let mut grid = HeightGrid::new(8, 8, 0.0).unwrap();
        let editor = HeightfieldEditor::new(&grid);
        let before = grid.clone();

        let negative = EditCommand::Raise {
            patch: Patch::new(-1, -1, 2, 2),
            delta: 10.0,
        };
        assert!(matches!(
            editor.apply(&mut grid, &negative),
            Err(TerrainError::OutOfBounds { .. })
        ));

        let overhang = EditCommand::Paint {
            patch: Patch::new(7, 0, 2, 1),
            elevation: 5.0,
        };
        assert!(editor.apply(&mut grid, &overhang).is_err());
        assert_eq!(grid, before);
    }

    #[test]
    fn test_oversized_bound_patch_is_rejected() {
        let json = format!(
            r#"{{ "w": {{ "op": "paint", "patch": {{ "x": 5, "z": 5, "width": {}, "depth": 2 }}, "elevation": 1.0 }} }}"#,
            usize::MAX
        );
        let bindings: EditBindings = serde_json::from_str(&json).unwrap();
        let mut grid = HeightGrid::new(8, 8, 0.0).unwrap();
        let editor = HeightfieldEditor::new(&grid);

        assert!(matches!(
            editor.handle_trigger(&bindings, &mut grid, "w"),
            Err(TerrainError::OutOfBounds { .. })
        ));
        assert!(grid.cells().iter().all(|h| *h == 0.0));
    }

    #[test]
    fn test_trigger_bindings() {
        let mut grid = HeightGrid::new(32, 32, 0.0).unwrap();
        let editor = HeightfieldEditor::new(&grid);
        let bindings = EditBindings::island_defaults((16, 16), 2, 10.0, 30.0);

        assert!(editor.handle_trigger(&bindings, &mut grid, "u").unwrap());
        assert_eq!(grid.get_height(17, 17).unwrap(), 10.0);

        assert!(editor.handle_trigger(&bindings, &mut grid, "j").unwrap());
        assert!(editor.handle_trigger(&bindings, &mut grid, "j").unwrap());
        assert_eq!(grid.get_height(16, 16).unwrap(), -10.0);

        assert!(editor.handle_trigger(&bindings, &mut grid, "r").unwrap());
        assert_eq!(grid.get_height(16, 16).unwrap(), 0.0);

        assert!(editor.handle_trigger(&bindings, &mut grid, "p").unwrap());
        assert_eq!(grid.get_height(12, 12).unwrap(), 30.0);

        assert!(!editor.handle_trigger(&bindings, &mut grid, "q").unwrap());
    }

    #[test]
    fn test_bindings_deserialize_from_json() {
        let json = r#"{
            "k": { "op": "raise", "patch": { "x": 1, "z": 2, "width": 2, "depth": 2 }, "delta": 5.0 },
            "l": { "op": "reset", "patch": { "x": 0, "z": 0, "width": 1, "depth": 1 } }
        }"#;
        let bindings: EditBindings = serde_json::from_str(json).unwrap();
        assert_eq!(bindings.len(), 2);
        assert_eq!(
            bindings.command("k"),
            Some(&EditCommand::Raise {
                patch: Patch::new(1, 2, 2, 2),
                delta: 5.0
            })
        );
    }
}
