use crate::geometry::{Interpolable, Quaternion, Vec3};

/// History of one rotating object's orientation within the current frame.
/// The last entry is always the current value; older entries are the
/// sub-steps accumulated since the last `collapse`. Backing storage is
/// reused across collapses so steady-state appends never allocate.
#[derive(Clone, Debug)]
pub struct Orientation {
    quats: Vec<Quaternion>,
    len: usize,
}

impl Orientation {
    pub fn new() -> Self {
        Orientation {
            quats: vec![Quaternion::IDENTITY],
            len: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn get(&self, index: usize) -> Quaternion {
        assert!(index < self.len);
        self.quats[index]
    }

    pub fn latest(&self) -> Quaternion {
        self.quats[self.len - 1]
    }

    /// Applies the orientation at `index` to a unit vector.
    pub fn orient_at(&self, v: Vec3, index: usize) -> Vec3 {
        self.get(index).rotate(v)
    }

    pub fn orient(&self, v: Vec3) -> Vec3 {
        self.latest().rotate(v)
    }

    /// Applies the inverse of the orientation at `index`.
    pub fn unorient_at(&self, v: Vec3, index: usize) -> Vec3 {
        self.get(index).conjugate().rotate(v)
    }

    pub fn unorient(&self, v: Vec3) -> Vec3 {
        self.latest().conjugate().rotate(v)
    }

    pub fn append(&mut self, q: Quaternion) {
        if self.len < self.quats.len() {
            self.quats[self.len] = q;
        } else {
            self.quats.push(q);
        }
        self.len += 1;
    }

    /// Grows the history to `target` entries by slerping between the
    /// existing ones, in place. The newest entry is never changed, so a
    /// fast rotation can be sub-sampled after the fact without disturbing
    /// the current value.
    pub fn upsample(&mut self, target: usize) {
        if target <= self.len {
            return;
        }
        while self.quats.len() < target {
            self.quats.push(Quaternion::IDENTITY);
        }
        if self.len == 1 {
            let only = self.quats[0];
            for slot in &mut self.quats[..target] {
                *slot = only;
            }
            self.len = target;
            return;
        }
        let source_len = self.len;
        // Walk destinations from the end backward so a source entry is
        // never clobbered before every destination that reads it is done.
        for i in (0..target).rev() {
            let t = i as f32 / (target - 1) as f32;
            let s = t * (source_len - 1) as f32;
            let lo = (s.floor() as usize).min(source_len - 1);
            let hi = (lo + 1).min(source_len - 1);
            let frac = s - lo as f32;
            // snapshot: the right endpoint may live in the slot about to
            // be overwritten
            let scratch = self.quats[hi];
            self.quats[i] = self.quats[lo].linear_interpolation(scratch, frac);
        }
        self.len = target;
    }

    /// Discards everything but the current value.
    pub fn collapse(&mut self) {
        self.quats[0] = self.quats[self.len - 1];
        self.len = 1;
    }

    pub fn copy_from(&mut self, source: &Orientation) {
        while self.quats.len() < source.len {
            self.quats.push(Quaternion::IDENTITY);
        }
        self.quats[..source.len].copy_from_slice(&source.quats[..source.len]);
        self.len = source.len;
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Orientation::new()
    }
}
