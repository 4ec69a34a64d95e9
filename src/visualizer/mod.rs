pub mod render;

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, info};
use tokio::sync::mpsc;

/// The sequence the visualizer starts with unless configured otherwise.
pub const DEFAULT_SEQUENCE: [u32; 8] = [45, 9, 78, 23, 12, 60, 31, 55];
/// Visual pacing unit between two checkpoints.
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Finished,
}

/// Immutable view of the engine at a checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct StepSnapshot<T> {
    pub values: Vec<T>,
    pub comparing: Option<(usize, usize)>,
    /// Indices confirmed to hold their final value. Always a suffix of the sequence.
    pub sorted: BTreeSet<usize>,
    pub state: RunState,
    pub passes: usize,
    pub comparisons: usize,
    pub swaps: usize,
}

impl<T: PartialOrd> StepSnapshot<T> {
    fn initial(values: Vec<T>) -> Self {
        Self {
            values,
            comparing: None,
            sorted: BTreeSet::new(),
            state: RunState::Idle,
            passes: 0,
            comparisons: 0,
            swaps: 0,
        }
    }

    /// Whether the highlighted pair is out of order and about to be swapped.
    pub fn pending_swap(&self) -> bool {
        match self.comparing {
            Some((left, right)) => self.values[left] > self.values[right],
            None => false,
        }
    }
}

/// Ordered snapshots of a single run. Closed when the run finishes or is reset.
pub type SnapshotStream<T> = mpsc::UnboundedReceiver<StepSnapshot<T>>;

struct Shared<T> {
    /// Bumped on every reset; a run only publishes while its generation is current.
    generation: u64,
    snapshot: StepSnapshot<T>,
}

/// Step-by-step bubble sort that can be started, watched and reset.
///
/// Clones share the same run, so a handle can be kept by whoever renders it
/// while another one resets it.
#[derive(Clone)]
pub struct SortEngine<T> {
    initial: Vec<T>,
    pacing: Duration,
    shared: Arc<Mutex<Shared<T>>>,
}

impl<T> SortEngine<T>
where
    T: PartialOrd + Clone + Send + 'static,
{
    pub fn new(initial: Vec<T>, pacing: Duration) -> Self {
        let snapshot = StepSnapshot::initial(initial.clone());
        Self {
            initial,
            pacing,
            shared: Arc::new(Mutex::new(Shared {
                generation: 0,
                snapshot,
            })),
        }
    }

    pub fn snapshot(&self) -> StepSnapshot<T> {
        self.lock().snapshot.clone()
    }

    pub fn state(&self) -> RunState {
        self.lock().snapshot.state
    }

    /// Starts a run from `Idle`. Returns `None` and changes nothing otherwise.
    ///
    /// Must be called from within a tokio runtime; the run is spawned as a task.
    pub fn start(&self) -> Option<SnapshotStream<T>> {
        let (run, stream) = {
            let mut shared = self.lock();
            if shared.snapshot.state != RunState::Idle {
                debug!("Ignoring start, engine is {:?}", shared.snapshot.state);
                return None;
            }
            shared.snapshot.state = RunState::Running;

            let (tx, rx) = mpsc::unbounded_channel();
            // The receiver is still in our hands, sending cannot fail here
            let _ = tx.send(shared.snapshot.clone());

            let run = SortRun {
                generation: shared.generation,
                values: self.initial.clone(),
                sorted: BTreeSet::new(),
                comparing: None,
                passes: 0,
                comparisons: 0,
                swaps: 0,
                pacing: self.pacing,
                shared: self.shared.clone(),
                tx,
            };
            (run, rx)
        };

        info!("Starting bubble sort over {} values", self.initial.len());
        tokio::spawn(run.execute());
        Some(stream)
    }

    /// Aborts any run in progress and restores the original sequence.
    pub fn reset(&self) -> StepSnapshot<T> {
        let mut shared = self.lock();
        if shared.snapshot.state == RunState::Running {
            info!("Cancelling bubble sort run {}", shared.generation);
        }
        shared.generation += 1;
        shared.snapshot = StepSnapshot::initial(self.initial.clone());
        shared.snapshot.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Shared<T>> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The state owned by a single run. Nothing outside the run touches `values`.
struct SortRun<T> {
    generation: u64,
    values: Vec<T>,
    sorted: BTreeSet<usize>,
    comparing: Option<(usize, usize)>,
    passes: usize,
    comparisons: usize,
    swaps: usize,
    pacing: Duration,
    shared: Arc<Mutex<Shared<T>>>,
    tx: mpsc::UnboundedSender<StepSnapshot<T>>,
}

impl<T> SortRun<T>
where
    T: PartialOrd + Clone + Send + 'static,
{
    async fn execute(mut self) {
        let n = self.values.len();

        // No early exit on a swap-free pass: every run performs n(n-1)/2 comparisons.
        // The last pass compares nothing and only confirms index 0.
        for i in 0..n {
            for j in 0..n - i - 1 {
                self.comparing = Some((j, j + 1));
                if !self.emit(RunState::Running) {
                    return self.cancelled();
                }
                let pause = self.pause();
                if !pause.await {
                    return self.cancelled();
                }

                self.comparisons += 1;
                if self.values[j] > self.values[j + 1] {
                    self.values.swap(j, j + 1);
                    self.swaps += 1;
                    if !self.emit(RunState::Running) {
                        return self.cancelled();
                    }
                    let pause = self.pause();
                    if !pause.await {
                        return self.cancelled();
                    }
                }
            }

            self.comparing = None;
            self.sorted.insert(n - i - 1);
            self.passes += 1;
            if !self.emit(RunState::Running) {
                return self.cancelled();
            }
        }

        self.comparing = None;
        if self.emit(RunState::Finished) {
            info!(
                "Bubble sort finished: {} comparisons, {} swaps",
                self.comparisons, self.swaps
            );
        } else {
            self.cancelled();
        }
    }

    /// One pacing unit. The returned future holds no borrow of the run.
    fn pause(&self) -> impl std::future::Future<Output = bool> + Send + 'static {
        checkpoint(self.pacing, self.shared.clone(), self.generation)
    }

    /// Publishes the current state. Returns `false` if the run has been reset.
    fn emit(&self, state: RunState) -> bool {
        let snapshot = StepSnapshot {
            values: self.values.clone(),
            comparing: self.comparing,
            sorted: self.sorted.clone(),
            state,
            passes: self.passes,
            comparisons: self.comparisons,
            swaps: self.swaps,
        };

        let mut shared = self.lock();
        if shared.generation != self.generation {
            return false;
        }
        shared.snapshot = snapshot.clone();
        // Sent under the lock so a reset can never slip in between publishing and sending.
        // A dropped receiver only means nobody is watching.
        let _ = self.tx.send(snapshot);
        true
    }

    fn cancelled(&self) {
        debug!(
            "Run {} stopped after {} comparisons",
            self.generation, self.comparisons
        );
    }

    fn lock(&self) -> MutexGuard<'_, Shared<T>> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Suspends for one pacing unit, then reports whether the run is still current.
async fn checkpoint<T>(pacing: Duration, shared: Arc<Mutex<Shared<T>>>, generation: u64) -> bool {
    tokio::time::sleep(pacing).await;
    let current = shared.lock().unwrap_or_else(PoisonError::into_inner).generation == generation;
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run_to_end<T>(engine: &SortEngine<T>) -> Vec<StepSnapshot<T>>
    where
        T: PartialOrd + Clone + Send + 'static,
    {
        let mut stream = engine.start().expect("engine should be idle");
        let mut snapshots = Vec::new();
        while let Some(snapshot) = stream.recv().await {
            snapshots.push(snapshot);
        }
        snapshots
    }

    fn engine(values: &[u32]) -> SortEngine<u32> {
        SortEngine::new(values.to_vec(), Duration::from_millis(600))
    }

    #[tokio::test(start_paused = true)]
    async fn test_worked_example() {
        let engine = engine(&[3, 1, 2]);
        let snapshots = run_to_end(&engine).await;

        let steps: Vec<_> = snapshots
            .iter()
            .map(|s| (s.values.clone(), s.comparing, s.sorted.iter().copied().collect::<Vec<_>>()))
            .collect();

        assert_eq!(
            steps,
            vec![
                (vec![3, 1, 2], None, vec![]),
                (vec![3, 1, 2], Some((0, 1)), vec![]),
                (vec![1, 3, 2], Some((0, 1)), vec![]),
                (vec![1, 3, 2], Some((1, 2)), vec![]),
                (vec![1, 2, 3], Some((1, 2)), vec![]),
                (vec![1, 2, 3], None, vec![2]),
                (vec![1, 2, 3], Some((0, 1)), vec![2]),
                (vec![1, 2, 3], None, vec![1, 2]),
                (vec![1, 2, 3], None, vec![0, 1, 2]),
                (vec![1, 2, 3], None, vec![0, 1, 2]),
            ]
        );

        let last = snapshots.last().unwrap();
        assert_eq!(last.state, RunState::Finished);
        assert_eq!(last.comparisons, 3);
        assert_eq!(last.swaps, 2);
        assert_eq!(engine.state(), RunState::Finished);
        assert_eq!(engine.snapshot(), *last);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sorts_and_counts_every_comparison() {
        let inputs: Vec<Vec<u32>> = vec![
            vec![5, 4],
            vec![1, 2, 3, 4, 5, 6],
            vec![9, 8, 7, 6, 5, 4, 3],
            DEFAULT_SEQUENCE.to_vec(),
            vec![2, 2, 1, 1, 2, 1],
        ];

        for input in inputs {
            let n = input.len();
            let engine = engine(&input);
            let snapshots = run_to_end(&engine).await;
            let last = snapshots.last().unwrap();

            let mut expected = input.clone();
            expected.sort();
            assert_eq!(last.values, expected, "input {:?}", input);
            assert_eq!(last.comparisons, n * (n - 1) / 2, "input {:?}", input);
            assert_eq!(last.passes, n);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_values_that_are_not_sync() {
        use std::cell::Cell;

        let engine = SortEngine::new(vec![Cell::new(2), Cell::new(1)], Duration::from_millis(600));
        let mut stream = engine.start().unwrap();
        let mut last = None;
        while let Some(snapshot) = stream.recv().await {
            last = Some(snapshot);
        }

        let values: Vec<u32> = last.unwrap().values.iter().map(Cell::get).collect();
        assert_eq!(values, [1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_suspends_only_at_highlight_and_swap() {
        let small = engine(&[3, 1, 2]);
        let started = tokio::time::Instant::now();
        let snapshots = run_to_end(&small).await;
        assert_eq!(started.elapsed(), Duration::from_millis(3000));

        let last = snapshots.last().unwrap();
        assert_eq!((last.comparisons, last.swaps), (3, 2));

        for input in [vec![1, 2, 3, 4], vec![4, 3, 2, 1], DEFAULT_SEQUENCE.to_vec()] {
            let run = engine(&input);
            let started = tokio::time::Instant::now();
            let snapshots = run_to_end(&run).await;
            let last = snapshots.last().unwrap();
            let checkpoints = (last.comparisons + last.swaps) as u32;
            assert_eq!(
                started.elapsed(),
                Duration::from_millis(600) * checkpoints,
                "input {:?}",
                input
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_sorted_input_still_runs_all_passes() {
        let engine = engine(&[1, 2, 3, 4]);
        let snapshots = run_to_end(&engine).await;

        let highlights = snapshots
            .iter()
            .filter(|s| s.comparing.is_some())
            .count();
        assert_eq!(highlights, 6);
        assert_eq!(snapshots.last().unwrap().swaps, 0);
    }

    #[derive(Debug, Clone)]
    struct Tagged {
        key: u32,
        tag: char,
    }

    impl PartialEq for Tagged {
        fn eq(&self, other: &Self) -> bool {
            self.key == other.key
        }
    }

    impl PartialOrd for Tagged {
        fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
            self.key.partial_cmp(&other.key)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_equal_values_keep_their_order() {
        let input = vec![
            Tagged { key: 2, tag: 'a' },
            Tagged { key: 1, tag: 'b' },
            Tagged { key: 2, tag: 'c' },
            Tagged { key: 1, tag: 'd' },
            Tagged { key: 2, tag: 'e' },
        ];
        let engine = SortEngine::new(input, Duration::from_millis(10));
        let snapshots = run_to_end(&engine).await;

        let tags: String = snapshots
            .last()
            .unwrap()
            .values
            .iter()
            .map(|t| t.tag)
            .collect();
        assert_eq!(tags, "bdace");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sorted_set_grows_as_suffix() {
        let input = vec![45, 9, 78, 23, 12, 60, 31, 55];
        let n = input.len();
        let mut descending = input.clone();
        descending.sort_by(|a, b| b.cmp(a));

        let engine = engine(&input);
        let snapshots = run_to_end(&engine).await;

        let mut previous = BTreeSet::new();
        for snapshot in &snapshots {
            assert!(snapshot.sorted.is_superset(&previous));
            previous = snapshot.sorted.clone();

            let k = snapshot.passes;
            let suffix: BTreeSet<usize> = (n - k..n).collect();
            assert_eq!(snapshot.sorted, suffix);
            for (rank, index) in (n - k..n).rev().enumerate() {
                assert_eq!(snapshot.values[index], descending[rank]);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_pair_highlighted_while_running() {
        let engine = engine(&[4, 3, 2, 1]);
        let snapshots = run_to_end(&engine).await;

        for snapshot in &snapshots {
            match snapshot.state {
                RunState::Running => {
                    if let Some((left, right)) = snapshot.comparing {
                        assert_eq!(right, left + 1);
                        assert!(!snapshot.sorted.contains(&right));
                    }
                }
                RunState::Finished => assert_eq!(snapshot.comparing, None),
                RunState::Idle => panic!("idle snapshot in a run"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_rejected_unless_idle() {
        let engine = engine(&[2, 1]);
        let mut stream = engine.start().unwrap();
        assert_eq!(engine.state(), RunState::Running);
        assert!(engine.start().is_none());

        while stream.recv().await.is_some() {}
        assert_eq!(engine.state(), RunState::Finished);
        assert!(engine.start().is_none());

        engine.reset();
        assert_eq!(engine.state(), RunState::Idle);
        assert!(engine.start().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_mid_run_restores_input() {
        let input = vec![45, 9, 78, 23, 12, 60, 31, 55];

        for steps in [1, 2, 5, 12, 30] {
            let engine = engine(&input);
            let mut stream = engine.start().unwrap();
            for _ in 0..steps {
                stream.recv().await.unwrap();
            }

            let restored = engine.reset();
            assert_eq!(restored.values, input);
            assert_eq!(restored.state, RunState::Idle);
            assert!(restored.sorted.is_empty());
            assert_eq!(restored.comparing, None);

            // The cancelled run drains without publishing anything else
            while stream.recv().await.is_some() {}
            assert_eq!(engine.snapshot(), restored);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_then_restart_runs_cleanly() {
        let engine = engine(&[3, 1, 2]);
        let mut first = engine.start().unwrap();
        first.recv().await.unwrap();
        first.recv().await.unwrap();
        engine.reset();

        let snapshots = run_to_end(&engine).await;
        assert_eq!(snapshots.first().unwrap().values, vec![3, 1, 2]);
        assert_eq!(snapshots.last().unwrap().values, vec![1, 2, 3]);
        assert_eq!(snapshots.last().unwrap().comparisons, 3);
        assert!(first.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tiny_sequences_finish() {
        let empty = SortEngine::<u32>::new(vec![], Duration::from_millis(600));
        let snapshots = run_to_end(&empty).await;
        assert_eq!(snapshots.last().unwrap().state, RunState::Finished);

        let single = engine(&[7]);
        let snapshots = run_to_end(&single).await;
        let last = snapshots.last().unwrap();
        assert_eq!(last.state, RunState::Finished);
        assert_eq!(last.comparisons, 0);
        assert!(last.sorted.contains(&0));
    }

    #[test]
    fn test_pending_swap() {
        let mut snapshot = StepSnapshot::initial(vec![3, 1, 2]);
        assert!(!snapshot.pending_swap());
        snapshot.comparing = Some((0, 1));
        assert!(snapshot.pending_swap());
        snapshot.comparing = Some((1, 2));
        assert!(!snapshot.pending_swap());
    }
}
