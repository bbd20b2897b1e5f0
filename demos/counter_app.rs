//! Counter application wiring a shared store to a tiny fake widget tree.
//!
//! Run with `RUST_LOG=neostate=debug` to see subscriptions come and go.

use std::cell::RefCell;
use std::rc::Rc;

use neostate::{
    bind, bind_two_way, BindingScope, ChangeListener, InputWidget, NotifyError, StateStore,
    Widget,
};
use tracing_subscriber::EnvFilter;

/// Read-only text widget.
struct Text {
    name: &'static str,
    content: String,
}

impl Text {
    fn new(name: &'static str) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            name,
            content: String::new(),
        }))
    }
}

impl Widget for Text {
    fn request_redraw(&mut self) {
        println!("   [redraw] {}: {}", self.name, self.content);
    }
}

/// Numeric input the "user" can type into.
struct StepInput {
    step: i64,
    on_change: Option<ChangeListener<i64>>,
}

impl StepInput {
    fn user_types(&mut self, step: i64) -> Result<(), NotifyError> {
        self.step = step;
        let Some(listener) = &self.on_change else {
            return Ok(());
        };
        if let Some(settled) = listener(step)? {
            self.step = settled;
        }
        Ok(())
    }
}

impl Widget for StepInput {
    fn request_redraw(&mut self) {
        println!("   [redraw] step input: {}", self.step);
    }
}

impl InputWidget<i64> for StepInput {
    fn set_change_listener(&mut self, listener: ChangeListener<i64>) {
        self.on_change = Some(listener);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Counter Application ===\n");

    println!("1. Initializing store");
    let store = StateStore::new();
    store.set("count", 0)?;
    store.set("step", 1)?;

    println!("\n2. Binding widgets");
    let display = Text::new("count");
    let parity = Text::new("parity");
    let step_input = Rc::new(RefCell::new(StepInput {
        step: 1,
        on_change: None,
    }));

    let mut scope = BindingScope::new();
    scope.push(bind(&store, "count", &display, |w: &mut Text, v: &i64| {
        w.content = v.to_string();
    }));
    scope.push(bind(&store, "count", &parity, |w: &mut Text, v: &i64| {
        w.content = if v % 2 == 0 { "even" } else { "odd" }.to_string();
    }));
    scope.push(bind_two_way(&store, "step", &step_input, |w: &mut StepInput, v: &i64| {
        w.step = *v;
    })?);

    let increment = |store: &StateStore<i64>| -> Result<(), NotifyError> {
        let step = store.get_or("step", 1);
        store.update("count", |count| *count += step)
    };

    println!("\n3. Incrementing...");
    increment(&store)?;
    increment(&store)?;

    println!("\n4. User changes the step to 5");
    step_input.borrow_mut().user_types(5)?;

    println!("\n5. Incrementing with new step...");
    increment(&store)?;

    println!("\n6. Dirty keys this frame: {:?}", store.take_dirty());

    println!("\n7. Unmounting the component");
    scope.teardown();
    store.set("count", 0)?;
    println!("   display still shows {}", display.borrow().content);

    println!("\n✓ Counter application complete!");
    Ok(())
}
