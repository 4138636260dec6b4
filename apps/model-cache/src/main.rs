fn main() -> anyhow::Result<()> {
    model_cache::internal_main()
}
