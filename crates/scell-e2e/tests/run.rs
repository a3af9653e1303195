//! Running cells from the bundled fixtures.
//!
//! Every scenario runs once per fixture directory under `SCELL_DATA_DIR`.
//! Run with `SCELL_BIN=/path/to/scell cargo test -p scell-e2e -- --ignored`.

use scell_e2e::{
    RUN_FIXTURES, RUN_PROMPT, ScellEnv, init_tracing, path_arg, prepare_session, stop_session,
};
use scell_expect::Session;

/// Start a cell from `fixture` and wait for its shell.
fn start(fixture: &str) -> Session {
    init_tracing();
    assert!(RUN_FIXTURES.contains(&fixture), "unknown fixture {fixture}");

    let env = ScellEnv::from_env().expect("Set SCELL_BIN to the path of the scell binary");
    let mut scell = env
        .scell([path_arg(&env.fixture(fixture))])
        .expect("Failed to spawn scell");
    prepare_session(&mut scell, RUN_PROMPT).expect("Failed to start session");
    scell
}

/// Run `command` in the cell and expect each of `outputs` in order.
fn check(scell: &mut Session, command: &str, outputs: &[&str]) {
    scell.send_line(command).expect("Failed to send command");
    for output in outputs {
        scell
            .expect(*output)
            .unwrap_or_else(|e| panic!("`{command}` did not print {output:?}: {e}"));
    }
}

/// Declare one test per fixture directory for a scenario.
macro_rules! per_fixture {
    ($($scenario:ident),* $(,)?) => {
        $(
            mod $scenario {
                #[test]
                #[ignore = "needs the scell binary (SCELL_BIN) and docker"]
                fn common() {
                    super::$scenario("common");
                }

                #[test]
                #[ignore = "needs the scell binary (SCELL_BIN) and docker"]
                fn from_docker() {
                    super::$scenario("from_docker");
                }
            }
        )*
    };
}

per_fixture!(simple_run, workspace, copy, env_var, build, mount);

fn simple_run(fixture: &str) {
    let mut scell = start(fixture);
    stop_session(&mut scell).expect("Failed to stop session");
}

fn workspace(fixture: &str) {
    let mut scell = start(fixture);
    check(&mut scell, "pwd", &["/app"]);
    stop_session(&mut scell).expect("Failed to stop session");
}

fn copy(fixture: &str) {
    let mut scell = start(fixture);
    check(&mut scell, "cat copy_test.txt", &["copy", "works!"]);
    check(&mut scell, "cat cp/copy_test.txt", &["copy", "works!"]);
    stop_session(&mut scell).expect("Failed to stop session");
}

fn env_var(fixture: &str) {
    let mut scell = start(fixture);
    check(&mut scell, "echo $ENV_TEST", &["env", "works!"]);
    stop_session(&mut scell).expect("Failed to stop session");
}

fn build(fixture: &str) {
    let mut scell = start(fixture);
    check(&mut scell, "cat build_test.txt", &["build", "works!"]);
    stop_session(&mut scell).expect("Failed to stop session");
}

fn mount(fixture: &str) {
    let mut scell = start(fixture);
    check(&mut scell, "cat mnt/mount_test.txt", &["mount", "works!"]);
    stop_session(&mut scell).expect("Failed to stop session");
}
