use tracing::debug;

use super::GraphReader;
use crate::grid::{BoundingBox, PointLL};

impl GraphReader {
    /// The smallest box holding every node inside `bbox` together with the
    /// full shapes of the edges leaving those nodes.
    ///
    /// Visits every road-level tile that intersects `bbox`, trimming the
    /// cache before each one so large queries stay within budget. Returns
    /// `None` when no node lies inside `bbox`.
    pub fn get_minimum_bounding_box(
        &self,
        bbox: &BoundingBox<PointLL>,
    ) -> Option<BoundingBox<PointLL>> {
        let mut extent: Option<BoundingBox<PointLL>> = None;
        for tile_id in self.hierarchy.graph_ids(bbox) {
            if self.over_committed() {
                self.trim();
            }
            let Some(tile) = self.get_tile(tile_id) else {
                continue;
            };

            for node in (0..tile.node_count()).filter_map(|index| tile.node(index)) {
                if !bbox.contains(&node.lat_lng) {
                    continue;
                }
                let extent = extent.get_or_insert_with(|| BoundingBox::from_point(node.lat_lng));
                extent.expand(&node.lat_lng);

                for (index, edge) in tile.directed_edges(&node) {
                    match tile.edge_shape(edge.edge_info_offset) {
                        Ok(shape) => shape.iter().for_each(|point| extent.expand(point)),
                        Err(e) => {
                            debug!(tile = %tile_id, edge = index, error = %e, "Edge has no shape");
                        }
                    }
                }
            }
        }
        extent
    }
}
