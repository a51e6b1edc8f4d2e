fn main() {
    if let Err(err) = skipper_lib::run() {
        eprintln!("skipper: {err:#}");
        std::process::exit(1);
    }
}
