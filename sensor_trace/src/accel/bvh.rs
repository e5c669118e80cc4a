//! Linear bounding volume hierarchy
//!
//! One structure serves both levels of the acceleration index: per-model
//! trees over triangles and the scene tree over enabled instances. The tree
//! only knows item bounds; callers resolve leaf items through closures.
//!
//! Build: each item gets a 30-bit Morton code of its bounds center, packed as
//! `(morton << 32) | item` and sorted with `rdst`. Ranges are split where
//! the highest Morton bit changes, falling back to the median when all codes
//! in a range are equal. Nodes are stored depth-first: the left child of an
//! interior node is always the next node.

use glam::Vec3;
use rdst::RadixSort;
use super::aabb::Aabb;

/// Bits per axis in a Morton code
const MORTON_BITS: u32 = 10;

/// A node of the flattened tree
#[derive(Debug, Clone, Copy)]
pub struct BvhNode {
    /// Bounds of every item below this node
    pub bounds: Aabb,
    /// Leaf: first slot in the item list. Interior: index of the right child.
    first: u32,
    /// Leaf: number of items. Interior: 0.
    count: u32,
}

impl BvhNode {
    pub fn is_leaf(&self) -> bool {
        self.count > 0
    }
}

/// Flattened BVH over a list of item bounds
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    items: Vec<u32>,
}

impl Bvh {
    /// Build a tree over `bounds`, at most `leaf_size` items per leaf
    pub fn build(bounds: &[Aabb], leaf_size: usize) -> Bvh {
        Self::from_keys(bounds, morton_keys(bounds), leaf_size)
    }

    /// Build from precomputed packed keys (see `morton_keys`)
    ///
    /// Lets a device compute the keys its own way (e.g. in parallel) and
    /// share the rest of the build.
    pub fn from_keys(bounds: &[Aabb], mut keys: Vec<u64>, leaf_size: usize) -> Bvh {
        debug_assert_eq!(bounds.len(), keys.len());
        if bounds.is_empty() {
            return Bvh::default();
        }

        keys.radix_sort_unstable();

        let codes: Vec<u32> = keys.iter().map(|key| (key >> 32) as u32).collect();
        let items: Vec<u32> = keys.iter().map(|key| *key as u32).collect();

        let mut builder = Builder {
            bounds,
            codes: &codes,
            items: &items,
            leaf_size: leaf_size.max(1),
            nodes: Vec::with_capacity(2 * bounds.len() / leaf_size.max(1) + 1),
        };
        builder.build_range(0, items.len());

        Bvh { nodes: builder.nodes, items }
    }

    /// Number of items the tree was built over
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Bounds of the whole tree (`Aabb::EMPTY` when empty)
    pub fn bounds(&self) -> Aabb {
        self.nodes.first().map(|node| node.bounds).unwrap_or(Aabb::EMPTY)
    }

    /// Longest root-to-leaf path, in nodes
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[BvhNode], index: usize) -> usize {
            let node = &nodes[index];
            if node.is_leaf() {
                1
            } else {
                1 + walk(nodes, index + 1).max(walk(nodes, node.first as usize))
            }
        }
        if self.nodes.is_empty() { 0 } else { walk(&self.nodes, 0) }
    }

    /// Recompute every node's bounds from moved item bounds, keeping the
    /// tree shape. Children always follow their parent, so one reverse pass
    /// suffices.
    pub fn refit(&mut self, bounds: &[Aabb]) {
        for index in (0..self.nodes.len()).rev() {
            let node = self.nodes[index];
            self.nodes[index].bounds = if node.is_leaf() {
                let start = node.first as usize;
                self.items[start..start + node.count as usize]
                    .iter()
                    .fold(Aabb::EMPTY, |acc, &item| acc.union(&bounds[item as usize]))
            } else {
                self.nodes[index + 1].bounds.union(&self.nodes[node.first as usize].bounds)
            };
        }
    }

    /// Nearest item hit along `origin + t * direction`, `t` in `[0, t_max]`.
    ///
    /// `hit_item(item, current_max)` returns the item's hit distance if it is
    /// hit within `current_max`. Returns the winning item and its distance.
    pub fn closest<F>(&self, origin: Vec3, direction: Vec3, t_max: f32, mut hit_item: F)
        -> Option<(u32, f32)>
    where
        F: FnMut(u32, f32) -> Option<f32>,
    {
        if self.nodes.is_empty() {
            return None;
        }
        let inv_direction = direction.recip();
        let mut best: Option<(u32, f32)> = None;
        let mut limit = t_max;

        let mut stack: Vec<(u32, f32)> = Vec::with_capacity(64);
        match self.nodes[0].bounds.ray_entry(origin, inv_direction, limit) {
            Some(entry) => stack.push((0, entry)),
            None => return None,
        }

        while let Some((index, entry)) = stack.pop() {
            if entry > limit {
                continue;
            }
            let node = &self.nodes[index as usize];

            if node.is_leaf() {
                let start = node.first as usize;
                for &item in &self.items[start..start + node.count as usize] {
                    if let Some(t) = hit_item(item, limit) {
                        if t <= limit {
                            limit = t;
                            best = Some((item, t));
                        }
                    }
                }
                continue;
            }

            let left = index + 1;
            let right = node.first;
            let left_entry = self.nodes[left as usize].bounds.ray_entry(origin, inv_direction, limit);
            let right_entry = self.nodes[right as usize].bounds.ray_entry(origin, inv_direction, limit);

            // Push the far child first so the near one is popped next
            match (left_entry, right_entry) {
                (Some(l), Some(r)) if l <= r => {
                    stack.push((right, r));
                    stack.push((left, l));
                }
                (Some(l), Some(r)) => {
                    stack.push((left, l));
                    stack.push((right, r));
                }
                (Some(l), None) => stack.push((left, l)),
                (None, Some(r)) => stack.push((right, r)),
                (None, None) => {}
            }
        }

        best
    }

    /// Whether any item is hit within `[0, t_max]`; stops at the first one.
    pub fn any<F>(&self, origin: Vec3, direction: Vec3, t_max: f32, mut hit_item: F) -> bool
    where
        F: FnMut(u32, f32) -> bool,
    {
        if self.nodes.is_empty() {
            return false;
        }
        let inv_direction = direction.recip();
        let mut stack: Vec<u32> = Vec::with_capacity(64);
        stack.push(0);

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            if node.bounds.ray_entry(origin, inv_direction, t_max).is_none() {
                continue;
            }
            if node.is_leaf() {
                let start = node.first as usize;
                let hit = self.items[start..start + node.count as usize]
                    .iter()
                    .any(|&item| hit_item(item, t_max));
                if hit {
                    return true;
                }
            } else {
                stack.push(node.first);
                stack.push(index + 1);
            }
        }

        false
    }
}

// ===== MORTON CODES =====

/// Bounds of all item centers, used to quantize Morton codes
pub fn centroid_bounds(bounds: &[Aabb]) -> Aabb {
    Aabb::from_points(bounds.iter().map(Aabb::center))
}

/// Packed sort key `(morton << 32) | item` for every item, in item order
pub fn morton_keys(bounds: &[Aabb]) -> Vec<u64> {
    let frame = centroid_bounds(bounds);
    bounds
        .iter()
        .enumerate()
        .map(|(item, aabb)| morton_key(&frame, aabb.center(), item as u32))
        .collect()
}

/// Packed sort key for one item center inside `frame`
pub fn morton_key(frame: &Aabb, center: Vec3, item: u32) -> u64 {
    let extent = frame.extent();
    let scale = ((1u32 << MORTON_BITS) - 1) as f32;
    let normalized = Vec3::select(
        extent.cmpgt(Vec3::ZERO),
        (center - frame.min) / extent,
        Vec3::ZERO,
    )
    .clamp(Vec3::ZERO, Vec3::ONE);
    let quantized = normalized * scale;

    let code = spread_bits(quantized.x as u32) << 2
        | spread_bits(quantized.y as u32) << 1
        | spread_bits(quantized.z as u32);

    (u64::from(code) << 32) | u64::from(item)
}

/// Insert two zero bits between each of the low 10 bits
fn spread_bits(value: u32) -> u32 {
    let mut v = value & 0x3ff;
    v = (v | (v << 16)) & 0x0300_00ff;
    v = (v | (v << 8)) & 0x0300_f00f;
    v = (v | (v << 4)) & 0x030c_30c3;
    v = (v | (v << 2)) & 0x0924_9249;
    v
}

// ===== BUILDER =====

struct Builder<'a> {
    bounds: &'a [Aabb],
    codes: &'a [u32],
    items: &'a [u32],
    leaf_size: usize,
    nodes: Vec<BvhNode>,
}

impl Builder<'_> {
    /// Emit the subtree for sorted slots `[start, end)`, returning its node index
    fn build_range(&mut self, start: usize, end: usize) -> u32 {
        let index = self.nodes.len() as u32;
        let bounds = self.items[start..end]
            .iter()
            .fold(Aabb::EMPTY, |acc, &item| acc.union(&self.bounds[item as usize]));

        let count = end - start;
        if count <= self.leaf_size {
            self.nodes.push(BvhNode { bounds, first: start as u32, count: count as u32 });
            return index;
        }

        self.nodes.push(BvhNode { bounds, first: 0, count: 0 });
        let split = self.split(start, end);
        self.build_range(start, split);
        let right = self.build_range(split, end);
        self.nodes[index as usize].first = right;
        index
    }

    /// First slot of the right half: where the highest differing Morton bit
    /// flips, or the median when every code in the range is equal.
    fn split(&self, start: usize, end: usize) -> usize {
        let first = self.codes[start];
        let last = self.codes[end - 1];
        if first == last {
            return start + (end - start) / 2;
        }

        let bit = 31 - (first ^ last).leading_zeros();
        let prefix_mask = !((1u32 << bit) - 1) & !(1u32 << bit);
        let right_prefix = (last & prefix_mask) | (1u32 << bit);

        // Codes are sorted, so the first code >= right_prefix starts the right half
        let offset = self.codes[start..end].partition_point(|&code| code < right_prefix);
        start + offset
    }
}
