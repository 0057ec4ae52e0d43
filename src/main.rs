fn main() -> anyhow::Result<()> {
    dmmedit_rust::run()
}
