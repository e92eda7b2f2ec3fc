//! `leafscan models`: print the remote models an API key can use.

use leafscan_remote::list_models;

use crate::config::ModelsArgs;

pub async fn run(args: &ModelsArgs) -> anyhow::Result<()> {
    let models = list_models(&args.api_base, &args.llm_api_key).await?;
    if models.is_empty() {
        println!("No models available for this key.");
        return Ok(());
    }

    println!("{} models:", models.len());
    for m in &models {
        println!();
        println!("  {}", m.name);
        if let Some(display) = &m.display_name {
            println!("    display name:  {display}");
        }
        println!("    methods:       {}", m.supported_generation_methods.join(", "));
        if m.supports_generate_content() {
            println!("    endpoint:      {}", m.generate_content_url(&args.api_base));
        }
    }
    Ok(())
}
