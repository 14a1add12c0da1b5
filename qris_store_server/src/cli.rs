use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // QRS_PAYMENT_SECRET is left out on purpose
    const DISPLAY_ENVS: [&str; 15] = [
        "RUST_LOG",
        "QRS_HOST",
        "QRS_PORT",
        "QRS_DATABASE_URL",
        "QRS_RUN_MIGRATIONS",
        "QRS_MERCHANT_PROFILE_PATH",
        "QRS_QR_VALIDITY_SECS",
        "QRS_ADMIN_IDS",
        "QRS_MAX_UPLOAD_BYTES",
        "QRS_EXPIRY_SWEEP_SECS",
        "QRS_PAID_NOTIFY_SECS",
        "QRS_STOCK_REPORT_SECS",
        "QRS_LOW_STOCK_THRESHOLD",
        "QRS_STOCK_REPORT_HOUR",
        "QRS_UTC_OFFSET_HOURS",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
