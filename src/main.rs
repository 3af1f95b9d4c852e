fn main() {
    if let Err(err) = query_oracle::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
