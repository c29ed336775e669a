use rand::seq::SliceRandom;
use rand::Rng;

use crate::collage::CollageRecord;
use crate::error::RoundError;
use crate::geometry::{Point, Rect, Surface};

/// A photo assigned to a layout slot for one round.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Position in the 600x600 logical canvas.
    pub rect: Rect,
    pub rotation_degrees: f64,
    /// Index into `CollageRecord::images`.
    pub image: usize,
    pub is_target: bool,
}

impl Placement {
    pub fn on_surface(&self, size: (f64, f64)) -> Rect {
        self.rect.scale_from_canvas(size)
    }

    /// Terminal cells this photo is drawn into: every cell whose centre lies
    /// inside the rotated photo, or the cell under its own centre when it is
    /// too small to cover any cell centre.
    pub fn cells(&self, surface: &Surface) -> Vec<(u16, u16)> {
        let rect = self.on_surface(surface.size());
        let bounds = rect.rotated_bounds(self.rotation_degrees);
        let (c0, r0) = surface.local_to_cell(Point::new(bounds.x, bounds.y));
        let (c1, r1) = surface.local_to_cell(Point::new(bounds.x + bounds.w, bounds.y + bounds.h));

        let cells: Vec<(u16, u16)> = (r0..=r1)
            .flat_map(|row| (c0..=c1).map(move |col| (col, row)))
            .filter(|&(col, row)| {
                surface
                    .cell_to_local(col, row)
                    .is_some_and(|centre| rect.contains_rotated(centre, self.rotation_degrees))
            })
            .collect();

        if cells.is_empty() {
            vec![surface.local_to_cell(rect.center())]
        } else {
            cells
        }
    }
}

/// Assigns images to every slot of the record for a fresh round.
///
/// The target is pinned to one slot picked uniformly at random. The decoys
/// are shuffled and dealt over the remaining slots in order; whenever the
/// deck runs out it is reshuffled, so a decoy never repeats within one pass
/// of the deck.
pub fn arrange<R: Rng + ?Sized>(
    record: &CollageRecord,
    rng: &mut R,
) -> Result<Vec<Placement>, RoundError> {
    let slots = &record.image_info;
    if slots.is_empty() {
        return Ok(Vec::new());
    }

    let target = record.target_index().ok_or(RoundError::NoTarget)?;
    let mut deck = record.decoy_indices();
    if deck.is_empty() && slots.len() > 1 {
        return Err(RoundError::NoDecoys { slots: slots.len() });
    }
    deck.shuffle(rng);

    let target_slot = rng.gen_range(0..slots.len());
    let mut placements = Vec::with_capacity(slots.len());

    for (idx, slot) in slots.iter().enumerate() {
        let image = if idx == target_slot {
            target
        } else {
            let dealt = if idx > target_slot { idx - 1 } else { idx };
            let pos = dealt % deck.len();
            if pos == 0 && dealt > 0 {
                deck.shuffle(rng);
            }
            deck[pos]
        };

        placements.push(Placement {
            rect: Rect::new(slot.x, slot.y, slot.w, slot.h),
            rotation_degrees: slot.rotate,
            image,
            is_target: idx == target_slot,
        });
    }

    Ok(placements)
}

/// Topmost placement under a surface-local point. Later placements are drawn
/// over earlier ones.
pub fn hit_test(placements: &[Placement], size: (f64, f64), point: Point) -> Option<usize> {
    placements.iter().rposition(|p| {
        p.on_surface(size)
            .contains_rotated(point, p.rotation_degrees)
    })
}

/// Placement drawn in a terminal cell, the last one drawn there winning.
pub fn cell_owner(placements: &[Placement], surface: &Surface, col: u16, row: u16) -> Option<usize> {
    placements
        .iter()
        .rposition(|p| p.cells(surface).contains(&(col, row)))
}
