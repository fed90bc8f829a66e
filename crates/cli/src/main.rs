fn main() -> std::process::ExitCode {
    tender_cli::run()
}
