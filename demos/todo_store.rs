//! Demonstration of a plain Store for managing a todo list

use tincan_select::{state, Store, StoreOptions};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug)]
struct TodoItem {
    id: usize,
    title: String,
    completed: bool,
}

#[derive(Clone, Debug, PartialEq)]
enum TodoFilter {
    All,
    Active,
    Completed,
}

state! {
    #[derive(Clone, Debug)]
    struct AppState => AppPatch {
        todos: Vec<TodoItem>,
        filter: TodoFilter,
    }
}

impl AppState {
    fn new() -> Self {
        Self {
            todos: Vec::new(),
            filter: TodoFilter::All,
        }
    }

    fn filtered_todos(&self) -> Vec<&TodoItem> {
        match self.filter {
            TodoFilter::All => self.todos.iter().collect(),
            TodoFilter::Active => self.todos.iter().filter(|t| !t.completed).collect(),
            TodoFilter::Completed => self.todos.iter().filter(|t| t.completed).collect(),
        }
    }

    fn stats(&self) -> (usize, usize, usize) {
        let total = self.todos.len();
        let completed = self.todos.iter().filter(|t| t.completed).count();
        let active = total - completed;
        (total, active, completed)
    }
}

fn add_todo(title: &str) -> impl FnOnce(&AppState) -> AppPatch + '_ {
    move |state| {
        let mut todos = state.todos.clone();
        todos.push(TodoItem {
            id: todos.len(),
            title: title.to_string(),
            completed: false,
        });
        AppPatch::default().todos(todos)
    }
}

fn toggle_todo(id: usize) -> impl FnOnce(&AppState) -> AppPatch {
    move |state| {
        let mut todos = state.todos.clone();
        if let Some(todo) = todos.iter_mut().find(|t| t.id == id) {
            todo.completed = !todo.completed;
        }
        AppPatch::default().todos(todos)
    }
}

fn print_todos(store: &Store<AppState>) {
    store.read(|state| {
        for todo in state.filtered_todos() {
            let status = if todo.completed { "✓" } else { " " };
            println!("   [{}] {}", status, todo.title);
        }
    });
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Store Example: Todo App ===\n");

    // The hook gets a detached copy; here it stands in for persistence.
    let store = Store::with_options(
        AppState::new(),
        StoreOptions::new().label("todos").on_update(|snapshot: AppState| {
            if snapshot.todos.len() > 2 {
                return Err(format!("refusing to persist {} todos", snapshot.todos.len()).into());
            }
            Ok(())
        }),
    );

    println!("1. Setting up subscriber");
    let reader = store.clone();
    let _sub = store.subscribe_fn(move || {
        let (total, active, completed) = reader.read(AppState::stats);
        println!(
            "   [Store Update] Total: {}, Active: {}, Completed: {}",
            total, active, completed
        );
    });

    println!("\n2. Adding todos");
    store.set_with(add_todo("Learn Rust"));
    store.set_with(add_todo("Build selective store"));
    // The hook fails from here on; listeners still run.
    store.set_with(add_todo("Write documentation"));

    println!("\n3. Current todos:");
    print_todos(&store);

    println!("\n4. Completing first todo");
    store.set_with(toggle_todo(0));

    println!("\n5. Completing second todo");
    store.set_with(toggle_todo(1));

    println!("\n6. Filtering to show only active todos");
    store.set(AppPatch::default().filter(TodoFilter::Active));
    print_todos(&store);

    println!("\n7. Filtering to show completed todos");
    store.set(AppPatch::default().filter(TodoFilter::Completed));
    print_todos(&store);

    println!("\n8. Final statistics:");
    let (total, active, completed) = store.read(AppState::stats);
    println!("   Total: {}", total);
    println!("   Active: {}", active);
    println!("   Completed: {}", completed);

    println!("\n✓ Example complete!");
}
