//! timevault main entrypoint.

use timevault::run;
use timevault::ui::messages::error;

fn main() {
    if let Err(e) = run() {
        error(e);
        std::process::exit(1);
    }
}
