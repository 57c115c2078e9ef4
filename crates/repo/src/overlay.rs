//! Default-variant overlay: every specific variant of an id inherits the
//! fields it leaves unset from the id's `_ _ _` variant.

use tracing::debug;

use crate::resource::Resource;
use crate::set::StagingSet;

/// Merge one variant against the default: fill-only field overlay, and
/// `mod_time` becomes the newer of the two.
pub fn overlay_onto<R: Resource>(variant: &mut R, default: &R) {
    variant.overlay(default);
    let base_time = default.key().mod_time;
    if variant.key().mod_time < base_time {
        variant.key_mut().mod_time = base_time;
    }
}

/// Overlay every id in `staging` that has a default variant.
///
/// Ids without a default are left untouched. Returns the number of
/// variants merged.
pub fn overlay_defaults<R: Resource>(staging: &mut StagingSet<R>) -> usize {
    let mut merged = 0;
    for (id, variants) in staging.entries.iter_mut() {
        let Some(pos) = variants.iter().position(|r| r.key().is_default()) else {
            debug!(id = %id, variants = variants.len(), "no default variant, serving unmerged");
            continue;
        };

        // Default first, then split so it can be borrowed alongside the rest.
        variants.swap(0, pos);
        let (head, rest) = variants.split_at_mut(1);
        let default = &head[0];
        for variant in rest {
            overlay_onto(variant, default);
            merged += 1;
        }
    }
    merged
}
