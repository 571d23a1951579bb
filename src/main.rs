fn main() {
    if let Err(e) = counterscope_lib::run() {
        eprintln!("counterscope: {}", e);
        std::process::exit(1);
    }
}
