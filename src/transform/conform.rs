use tracing::warn;

use crate::metadata::Geometry;
use crate::transform::Transform;
use crate::volume::Volume;

/// Overwrites origin, spacing and direction with those of a reference volume.
///
/// Voxel content and size are left untouched, so the result only lines up with the
/// reference when both were already sampled on the same grid. Use
/// [`Resampler`](crate::transform::Resampler) to move voxels onto a different grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CopyMetadata {
    reference: Geometry,
}

impl CopyMetadata {
    pub fn new(reference: Geometry) -> Self {
        Self { reference }
    }

    pub fn from_reference(reference: &Volume) -> Self {
        Self::new(*reference.geometry())
    }

    pub fn apply_in_place(&self, volume: &mut Volume) {
        if volume.size() != self.reference.size {
            warn!(
                "Copying spatial metadata between grids of different size: {:?} vs reference {:?}",
                volume.size(),
                self.reference.size
            );
        }
        volume.set_origin(self.reference.origin);
        volume.set_spacing(self.reference.spacing);
        volume.set_direction(self.reference.direction);
    }
}

impl Transform<Volume> for CopyMetadata {
    fn apply(&self, volume: &Volume) -> Volume {
        let mut volume = volume.clone();
        self.apply_in_place(&mut volume);
        volume
    }
}
