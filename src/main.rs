fn main() -> anyhow::Result<()> {
    workbay_lib::run()
}
