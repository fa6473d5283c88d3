//! A deploy-style pipeline on std threads.
//!
//! Run with `cargo run --example pipeline` for the live reporter, or
//! `cargo run --example pipeline -- ci` for append-only output. Pass `fail`
//! as a second argument to see the error summary.

use std::thread::sleep;
use std::time::Duration;

use tool_tally::*;

fn work(ms: u64) {
    sleep(Duration::from_millis(ms));
}

fn main() {
    let mut args = std::env::args().skip(1);
    let mut options = ToolOptions::new("deploy").footer("Deployed").theme("solarized");
    if let Some(reporter) = args.next() {
        options = options.reporter(reporter);
    }
    let fail = args.next().as_deref() == Some("fail");

    let tool = Tool::new(options, Environment::detect());

    let pipeline = Pipeline::new()
        .pipe(routine("install dependencies", |ctx| {
            ctx.write("resolved 142 packages\n");
            work(400);
            Ok(())
        }))
        .pipe(routine("build", |ctx| {
            ctx.task("compile", |_| {
                work(700);
                Ok(())
            })?;
            ctx.task("bundle", |ctx| {
                ctx.task("minify", |_| {
                    work(300);
                    Ok(())
                })?;
                ctx.skip_task("source maps")?;
                work(200);
                Ok(())
            })
        }))
        .pipe(routine("test", move |ctx| {
            let suites = ["unit", "integration", "e2e"]
                .into_iter()
                .enumerate()
                .map(|(i, name)| {
                    let suite = job(move |_| {
                        work(300 * (i as u64 + 1));
                        if fail && name == "e2e" {
                            return Err(Failure::new("2 of 40 e2e tests failed")
                                .with_cause("timed out waiting for the login page"));
                        }
                        Ok(())
                    });
                    (name, suite)
                });
            let lint = job(|ctx| ctx.task("clippy", |_| Ok(())));
            ctx.parallel(suites.chain([("lint", lint)]))
        }))
        .pipe(routine("upload", |ctx| {
            work(500);
            ctx.log("uploaded 3 artifacts to s3://releases");
            Ok(())
        }));

    if tool.run(pipeline).is_err() {
        std::process::exit(1);
    }
}
