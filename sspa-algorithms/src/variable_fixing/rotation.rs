use rand::{rngs::SmallRng, seq::SliceRandom, SeedableRng};
use sspa_instances::{Assignment, Instance};
use sspa_structs::config::RotationOrder;

/// Chooses which students stay free in each iteration.
///
/// Students are queued once per rotation in the configured order and handed
/// out in consecutive windows, so one rotation frees every student at least
/// once. A window never equals the one handed out just before it unless the
/// whole student body is free.
pub struct Rotation {
    order: RotationOrder,
    rng: SmallRng,
    queue: Vec<usize>,
    cursor: usize,
    last: Option<Vec<usize>>,
}

impl Rotation {
    pub fn new(order: RotationOrder, seed: u64) -> Self {
        Self {
            order,
            rng: SmallRng::seed_from_u64(seed),
            queue: Vec::new(),
            cursor: 0,
            last: None,
        }
    }

    /// Next free set of `size` students, sorted by id.
    pub fn next_free_set(
        &mut self,
        size: usize,
        instance: &Instance,
        incumbent: &Assignment,
    ) -> Vec<usize> {
        let n = instance.num_students();
        let size = size.clamp(1, n.max(1));
        if self.cursor >= self.queue.len() {
            self.refill(instance, incumbent);
            if size < n && self.window(size) == self.last {
                self.queue.rotate_left(size);
            }
        }
        let window = self.window(size).unwrap_or_default();
        self.cursor += size;
        self.last = Some(window.clone());
        window
    }

    fn window(&self, size: usize) -> Option<Vec<usize>> {
        if self.queue.is_empty() {
            return None;
        }
        let mut window: Vec<usize> = self
            .queue
            .iter()
            .cycle()
            .skip(self.cursor)
            .take(size.min(self.queue.len()))
            .copied()
            .collect();
        window.sort_unstable();
        Some(window)
    }

    fn refill(&mut self, instance: &Instance, incumbent: &Assignment) {
        self.cursor = 0;
        self.queue = (0..instance.num_students()).collect();
        match self.order {
            RotationOrder::Sequential => {}
            RotationOrder::Shuffled => self.queue.shuffle(&mut self.rng),
            RotationOrder::PreferenceWeighted => {
                if let Ok(scores) = instance.student_contributions(incumbent) {
                    self.queue
                        .sort_by(|&a, &b| scores[a].total_cmp(&scores[b]).then(a.cmp(&b)));
                }
            }
        }
    }
}
