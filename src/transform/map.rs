//! Position maps: how positions in a document before a step relate to
//! positions after it.

/// Which side a position sticks to when content is inserted exactly at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bias {
    Before,
    #[default]
    After,
}

const DEL_BEFORE: u8 = 1;
const DEL_AFTER: u8 = 2;
const DEL_ACROSS: u8 = 4;
const DEL_SIDE: u8 = 8;

/// A mapped position plus what happened to the content around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapResult {
    pub pos: usize,
    del_info: u8,
}

impl MapResult {
    /// The content on the side the position is biased toward was deleted.
    pub fn deleted(&self) -> bool {
        self.del_info & DEL_SIDE > 0
    }

    pub fn deleted_before(&self) -> bool {
        self.del_info & (DEL_BEFORE | DEL_ACROSS) > 0
    }

    pub fn deleted_after(&self) -> bool {
        self.del_info & (DEL_AFTER | DEL_ACROSS) > 0
    }

    pub fn deleted_across(&self) -> bool {
        self.del_info & DEL_ACROSS > 0
    }
}

/// Replaced ranges of one step, as `(start, old_size, new_size)` triples in
/// document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepMap {
    ranges: Vec<(usize, usize, usize)>,
    inverted: bool,
}

impl StepMap {
    pub fn new(ranges: Vec<(usize, usize, usize)>) -> Self {
        Self {
            ranges,
            inverted: false,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn ranges(&self) -> &[(usize, usize, usize)] {
        &self.ranges
    }

    pub fn map(&self, pos: usize, bias: Bias) -> usize {
        self.map_result(pos, bias).pos
    }

    pub fn map_result(&self, pos: usize, bias: Bias) -> MapResult {
        let mut diff: isize = 0;
        for &(range_start, old, new) in &self.ranges {
            let (old_size, new_size) = if self.inverted { (new, old) } else { (old, new) };
            let start = if self.inverted {
                offset(range_start, -diff)
            } else {
                range_start
            };
            if start > pos {
                break;
            }
            let end = start + old_size;
            if pos <= end {
                let after = if old_size == 0 {
                    bias == Bias::After
                } else if pos == start {
                    false
                } else if pos == end {
                    true
                } else {
                    bias == Bias::After
                };
                let mapped = offset(start, diff) + if after { new_size } else { 0 };
                let mut del_info = if pos == start {
                    DEL_AFTER
                } else if pos == end {
                    DEL_BEFORE
                } else {
                    DEL_ACROSS
                };
                let on_side = match bias {
                    Bias::Before => pos != start,
                    Bias::After => pos != end,
                };
                if on_side {
                    del_info |= DEL_SIDE;
                }
                return MapResult {
                    pos: mapped,
                    del_info,
                };
            }
            diff += new_size as isize - old_size as isize;
        }
        MapResult {
            pos: offset(pos, diff),
            del_info: 0,
        }
    }

    /// The map of the inverse step.
    pub fn invert(&self) -> StepMap {
        StepMap {
            ranges: self.ranges.clone(),
            inverted: !self.inverted,
        }
    }
}

fn offset(pos: usize, diff: isize) -> usize {
    pos.saturating_add_signed(diff)
}

/// A sequence of step maps, applied in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    pub fn append_map(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    pub fn append_mapping(&mut self, other: &Mapping) {
        self.maps.extend(other.maps.iter().cloned());
    }

    /// The maps from `from` to `to` (exclusive) as a new mapping. Bounds are
    /// clamped to the maps present.
    pub fn slice(&self, from: usize, to: usize) -> Mapping {
        let to = to.min(self.maps.len());
        Mapping {
            maps: self.maps[from.min(to)..to].to_vec(),
        }
    }

    pub fn map(&self, pos: usize, bias: Bias) -> usize {
        self.maps.iter().fold(pos, |pos, map| map.map(pos, bias))
    }

    pub fn map_result(&self, pos: usize, bias: Bias) -> MapResult {
        let mut del_info = 0;
        let mut pos = pos;
        for map in &self.maps {
            let result = map.map_result(pos, bias);
            del_info |= result.del_info;
            pos = result.pos;
        }
        MapResult { pos, del_info }
    }

    /// The mapping that undoes this one.
    pub fn invert(&self) -> Mapping {
        Mapping {
            maps: self.maps.iter().rev().map(StepMap::invert).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_shifts_following_positions() {
        let map = StepMap::new(vec![(2, 0, 4)]);
        assert_eq!(map.map(1, Bias::After), 1);
        assert_eq!(map.map(2, Bias::Before), 2);
        assert_eq!(map.map(2, Bias::After), 6);
        assert_eq!(map.map(5, Bias::After), 9);
    }

    #[test]
    fn deletion_collapses_positions() {
        let map = StepMap::new(vec![(2, 3, 0)]);
        let inside = map.map_result(3, Bias::After);
        assert_eq!(inside.pos, 2);
        assert!(inside.deleted());
        assert!(inside.deleted_across());
        assert_eq!(map.map(5, Bias::After), 2);
        assert!(!map.map_result(5, Bias::After).deleted());
        assert_eq!(map.map(8, Bias::After), 5);
    }

    #[test]
    fn inverted_map_undoes_positions() {
        let map = StepMap::new(vec![(2, 0, 4), (10, 2, 0)]);
        let inverse = map.invert();
        for pos in [0, 1, 7, 12, 20] {
            let forward = map.map(pos, Bias::After);
            if !(10..=12).contains(&pos) {
                assert_eq!(inverse.map(forward, Bias::After), pos);
            }
        }
    }

    #[test]
    fn mapping_composes_in_order() {
        let mut mapping = Mapping::new();
        mapping.append_map(StepMap::new(vec![(0, 0, 2)]));
        mapping.append_map(StepMap::new(vec![(4, 2, 0)]));
        assert_eq!(mapping.map(3, Bias::After), 4);
        assert_eq!(mapping.slice(0, 1).map(3, Bias::After), 5);
        assert!(mapping.map_result(2, Bias::After).deleted());
    }

    #[test]
    fn mapping_slice_clamps_out_of_range_bounds() {
        let mut mapping = Mapping::new();
        mapping.append_map(StepMap::new(vec![(0, 0, 2)]));
        mapping.append_map(StepMap::new(vec![(4, 2, 0)]));
        assert_eq!(mapping.slice(0, 9).map(3, Bias::After), 4);
        assert_eq!(mapping.slice(1, 9).map(5, Bias::After), 4);
        assert_eq!(mapping.slice(5, 9).map(7, Bias::After), 7);
        assert_eq!(mapping.slice(2, 1).map(7, Bias::After), 7);
    }
}
