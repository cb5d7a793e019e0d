//! Counter application: three consumers share one store, each re-rendering
//! only when its own slice changes.
//!
//! Run with `RUST_LOG=tincan_select=trace` to see store activity.

use std::cell::Cell;
use std::rc::Rc;
use tincan_select::{create_selective_store, state, BoundSelector};
use tracing_subscriber::EnvFilter;

state! {
    #[derive(Clone, Debug)]
    struct CounterState => CounterPatch {
        count: i32,
        step: i32,
        history: Vec<i32>,
    }
}

impl CounterState {
    fn new() -> Self {
        Self {
            count: 0,
            step: 1,
            history: vec![0],
        }
    }
}

fn increment(s: &CounterState) -> CounterPatch {
    let count = s.count + s.step;
    let mut history = s.history.clone();
    history.push(count);
    CounterPatch::default().count(count).history(history)
}

fn decrement(s: &CounterState) -> CounterPatch {
    let count = s.count - s.step;
    let mut history = s.history.clone();
    history.push(count);
    CounterPatch::default().count(count).history(history)
}

/// Stand-in for a rendered component: prints whenever its binding delivers.
fn render_on_change<O: std::fmt::Debug + Clone + 'static>(
    name: &'static str,
    bound: &Rc<BoundSelector<CounterState, O>>,
) -> Rc<Cell<u32>> {
    let renders = Rc::new(Cell::new(0));
    let renders_clone = Rc::clone(&renders);
    let weak = Rc::downgrade(bound);
    bound.on_invalidate(move || {
        renders_clone.set(renders_clone.get() + 1);
        if let Some(bound) = weak.upgrade() {
            println!("   [render] {name}: {:?}", bound.get());
        }
    });
    renders
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Complete Counter Application ===\n");

    println!("1. Creating the store factory");
    let counter = create_selective_store(CounterState::new())
        .label("counter")
        .on_update(|snapshot: CounterState| {
            println!("   [on_update] count={} step={}", snapshot.count, snapshot.step);
            Ok(())
        });

    counter.provider().provide(|| {
        println!("\n2. Binding consumers");
        let count = Rc::new(counter.use_bound_selector(|s: &CounterState| s.count).unwrap());
        let parity = Rc::new(
            counter
                .use_bound_selector(|s: &CounterState| if s.count % 2 == 0 { "even" } else { "odd" })
                .unwrap(),
        );
        let step = Rc::new(counter.use_bound_selector(|s: &CounterState| s.step).unwrap());

        let count_renders = render_on_change("count", &count);
        let parity_renders = render_on_change("parity", &parity);
        let step_renders = render_on_change("step", &step);

        let (_, set_state) = count.parts();

        println!("\n3. Incrementing...");
        set_state.set_with(increment);
        set_state.set_with(increment);
        set_state.set_with(increment);

        println!("\n4. Changing step size to 5");
        set_state.set(CounterPatch::default().step(5));

        println!("\n5. Incrementing with new step...");
        set_state.set_with(increment);

        println!("\n6. Decrementing...");
        set_state.set_with(decrement);
        set_state.set_with(decrement);

        println!("\n7. History:");
        println!("   {:?}", count.store().get().history);

        println!("\n8. Resetting...");
        set_state.set(CounterPatch::default().count(0).history(vec![0]));

        println!("\n9. Render counts:");
        println!("   count:  {}", count_renders.get());
        println!("   parity: {}", parity_renders.get());
        println!("   step:   {}", step_renders.get());
    });

    println!("\n✓ Counter application complete!");
}
