//
// main.rs
//
// Entry point of the n3-lsp binary
//

use std::env;

use n3_lsp::backend;

fn print_usage() {
    println!(
        "n3-lsp {}, a language server for N3 and Turtle.",
        env!("CARGO_PKG_VERSION")
    );
    print!(
        r#"
Usage: n3-lsp [OPTIONS]

Available options:

--stdio                      Start the LSP server using stdio transport
--version                    Print the version
--help                       Print this help message

Environment:

RUST_LOG                     Log filter, e.g. RUST_LOG=n3_lsp=debug
N3_LSP_PERF                  Log analysis pass timings (set to 'verbose' for slow pass warnings)

"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut argv = env::args();
    argv.next(); // skip executable name

    let mut use_stdio = false;

    for arg in argv {
        match arg.as_str() {
            "--stdio" => use_stdio = true,
            "--version" => {
                println!("n3-lsp {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" => {
                print_usage();
                return Ok(());
            }
            other => {
                return Err(anyhow::anyhow!("Unknown argument: '{other}'"));
            }
        }
    }

    if !use_stdio {
        print_usage();
        return Ok(());
    }

    env_logger::init();

    backend::start_lsp().await
}
