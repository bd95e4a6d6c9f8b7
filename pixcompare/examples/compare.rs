use pixcompare::{ComparisonSession, SourceId};
use std::env;
use std::fs;
use std::process::ExitCode;

fn load(session: &ComparisonSession, path: &str) -> Result<pixcompare::RasterImage, String> {
    let bytes = fs::read(path).map_err(|e| format!("failed to read {path}: {e}"))?;
    session
        .load(SourceId::file(path, bytes.len() as u64), &bytes)
        .map_err(|e| format!("{path}: {e}"))
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: compare <image1> <image2> [--diff <out.png>]");
        return ExitCode::from(2);
    }

    let mut session = ComparisonSession::default();
    let (a, b) = match (load(&session, &args[1]), load(&session, &args[2])) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    let metrics = match session.compare(&a, &b) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };
    println!("{metrics}");

    // If --diff <path> is given, write the difference map as PNG
    if let Some(idx) = args.iter().position(|a| a == "--diff") {
        if let Some(path) = args.get(idx + 1) {
            let written = session
                .difference(&a, &b)
                .map_err(|e| e.to_string())
                .and_then(|diff| diff.to_rgba_image().ok_or_else(|| "diff too large".to_string()))
                .and_then(|img| img.save(path).map_err(|e| e.to_string()));
            match written {
                Ok(()) => eprintln!("Wrote difference map to {path}"),
                Err(e) => {
                    eprintln!("error: {e}");
                    return ExitCode::from(2);
                }
            }
        }
    }

    ExitCode::SUCCESS
}
