use std::collections::BTreeMap;

use station_core::layer;

/// Symmetric layer × layer collision table.
///
/// Pairs default to colliding when never configured. The key is the sorted
/// pair, so `set` and `collides` agree for both argument orders.
#[derive(Debug, Clone)]
pub struct LayerMatrix {
    pairs: BTreeMap<(u32, u32), bool>,
}

fn pair_key(a: u32, b: u32) -> (u32, u32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl LayerMatrix {
    /// Empty matrix: everything collides.
    pub fn all_colliding() -> Self {
        Self {
            pairs: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, layer_a: u32, layer_b: u32, collides: bool) {
        self.pairs.insert(pair_key(layer_a, layer_b), collides);
    }

    pub fn collides(&self, layer_a: u32, layer_b: u32) -> bool {
        self.pairs
            .get(&pair_key(layer_a, layer_b))
            .copied()
            .unwrap_or(true)
    }
}

impl Default for LayerMatrix {
    /// Station defaults: items pass through each other, everything else
    /// collides.
    fn default() -> Self {
        let mut matrix = Self::all_colliding();
        matrix.set(layer::ITEM, layer::ITEM, false);
        matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_pairs_collide() {
        let matrix = LayerMatrix::all_colliding();
        assert!(matrix.collides(layer::PLAYER, layer::WALL));
    }

    #[test]
    fn set_is_symmetric() {
        let mut matrix = LayerMatrix::all_colliding();
        matrix.set(layer::PLAYER, layer::ENEMY, false);
        assert!(!matrix.collides(layer::PLAYER, layer::ENEMY));
        assert!(!matrix.collides(layer::ENEMY, layer::PLAYER));
    }

    #[test]
    fn default_excludes_item_pairs() {
        let matrix = LayerMatrix::default();
        assert!(!matrix.collides(layer::ITEM, layer::ITEM));
        assert!(matrix.collides(layer::ITEM, layer::PLAYER));
    }
}
