//! Driving a reporter from a tokio `select!` loop.
//!
//! Reporters only expose deadlines, so an async runtime can own the render
//! loop: sleep until `next_deadline()`, call `tick()`, and apply events as
//! they arrive. Application logs go through `tracing` and show up in the
//! summary via `reporter_layer`.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tool_tally::*;

// -- Render loop -------------------------------------------------------------

async fn render_loop(mut reporter: DefaultReporter, mut rx: mpsc::UnboundedReceiver<ToolEvent>) {
    while reporter.base().phase() != Phase::Finalized {
        let deadline = reporter.next_deadline();
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => reporter.handle_event(event, Instant::now()).unwrap(),
                None => reporter.handle_base_stop(None).unwrap(),
            },
            _ = sleep_until(deadline) => reporter.tick(Instant::now()).unwrap(),
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}

// Subscriptions block, so forward them into the runtime from a blocking task.
fn forward(subscription: Subscription) -> mpsc::UnboundedReceiver<ToolEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::task::spawn_blocking(move || {
        while let Ok(event) = subscription.next(None) {
            let stop = event.kind() == EventKind::Stop;
            if tx.send(event).is_err() || stop {
                break;
            }
        }
    });
    rx
}

// -- Work --------------------------------------------------------------------

async fn step(emitter: Emitter, title: &str, depth: usize, steps: &[(&str, u64)]) {
    let mut task = Task::new(title);
    task.start(now_millis()).unwrap();
    emitter.emit(ToolEvent::Task { task: task.clone(), depth });

    for (message, ms) in steps {
        tokio::time::sleep(Duration::from_millis(*ms)).await;
        tracing::info!(target: "demo", task = title, "{message}");
    }

    task.pass(now_millis()).unwrap();
    emitter.emit(ToolEvent::Task { task, depth });
}

#[tokio::main]
async fn main() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let emitter = Emitter::new();
    tracing_subscriber::registry()
        .with(reporter_layer(emitter.clone()))
        .init();

    let options = ReporterOptions::default().environment(Environment::detect());
    let mut reporter = DefaultReporter::new(options);
    let rx = forward(reporter.bootstrap(&emitter));
    let render = tokio::spawn(render_loop(reporter, rx));

    emitter.emit(ToolEvent::Start);

    let compile = tokio::spawn(step(
        emitter.clone(),
        "compile",
        0,
        &[("parsing", 300), ("type checking", 300), ("codegen", 300), ("linking", 300)],
    ));
    let docker = tokio::spawn(step(
        emitter.clone(),
        "docker",
        0,
        &[("pulling image", 400), ("building layers", 400), ("pushing", 400)],
    ));
    compile.await.unwrap();
    docker.await.unwrap();

    tracing::info!(target: "demo", "pipeline complete");
    emitter.emit(ToolEvent::Stop(None));
    render.await.unwrap();
}
