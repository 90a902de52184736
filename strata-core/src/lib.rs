pub mod config;
pub mod data;
pub mod error;
pub mod report;
pub mod walk;

use colored::Colorize;

pub use config::WalkConfig;
pub use error::{CoreError, Result};
pub use walk::{WalkMessageCallback, WalkOptions, WalkSummary, execute_walk, execute_walk_with};

pub fn print_banner() {
    let banner = r#"
     _             _
 ___| |_ _ __ __ _| |_ __ _
/ __| __| '__/ _` | __/ _` |
\__ \ |_| | | (_| | || (_| |
|___/\__|_|  \__,_|\__\__,_|
"#;
    println!("{}", banner.bright_cyan().bold());
    println!(
        "{} {}\n",
        "strata".bright_white().bold(),
        format!("v{} - depth-bounded link frontier walker", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
