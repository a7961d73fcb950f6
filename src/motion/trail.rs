use crate::motion::Orientation;

/// Fixed-capacity ring of per-frame `Orientation` snapshots, oldest first.
/// Each slot owns its storage and is deep-copied into on `record`, so trail
/// history never aliases the live orientation it was taken from.
pub struct OrientationTrail {
    frames: Vec<Orientation>,
    head: usize,
    count: usize,
}

impl OrientationTrail {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "trail capacity must be positive");
        OrientationTrail {
            frames: (0..capacity).map(|_| Orientation::new()).collect(),
            head: 0,
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Snapshots the full sub-step history of `orientation` into the ring,
    /// overwriting the oldest frame once full.
    pub fn record(&mut self, orientation: &Orientation) {
        let capacity = self.frames.len();
        self.frames[self.head].copy_from(orientation);
        self.head = (self.head + 1) % capacity;
        if self.count < capacity {
            self.count += 1;
        }
    }

    /// Index 0 is the oldest retained snapshot, `len() - 1` the newest.
    pub fn get(&self, index: usize) -> &Orientation {
        assert!(index < self.count);
        let capacity = self.frames.len();
        &self.frames[(self.head + capacity - self.count + index) % capacity]
    }

    /// Ages out the oldest snapshot without recording a new one, for
    /// frames where the tracked object did not move.
    pub fn expire(&mut self) {
        if self.count > 0 {
            self.count -= 1;
        }
    }

    /// Visits every sub-orientation across the whole trail with one
    /// continuous progress value in `[0, 1]`, skipping the first entry of
    /// every frame after the first so shared boundary points are not
    /// visited twice.
    pub fn deep_tween(&self, mut visit: impl FnMut(f32, &Orientation, usize)) {
        let frame_count = self.count;
        for i in 0..frame_count {
            let frame = self.get(i);
            let frame_len = frame.len();
            let start = if i > 0 { 1 } else { 0 };
            for j in start..frame_len {
                let local = if frame_len > 1 {
                    j as f32 / (frame_len - 1) as f32
                } else {
                    0.0
                };
                let global_t = (i as f32 + local) / frame_count as f32;
                visit(global_t, frame, j);
            }
        }
    }
}
