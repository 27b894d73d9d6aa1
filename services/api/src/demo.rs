use crate::infra::{build_assembler, SeedAssembler, SiteSeed};
use clap::Args;
use site_composer::composition::{
    AssembledPage, AssemblyError, FieldOrigin, Locale, PageIdentity, ResolvedBlock, Scope,
};
use site_composer::config::{AppConfig, CompositionConfig};
use site_composer::error::AppError;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct RenderArgs {
    /// Tenant identifier, e.g. inmobiliaria-sol
    #[arg(long)]
    pub(crate) tenant: String,
    /// Page type code, e.g. homepage or landing
    #[arg(long)]
    pub(crate) page_type: String,
    /// Specific page id within the page type
    #[arg(long)]
    pub(crate) page_id: Option<String>,
    /// Locale for titles and fetched content (defaults to APP_DEFAULT_LOCALE)
    #[arg(long)]
    pub(crate) locale: Option<String>,
    /// JSON seed to read instead of the configured one
    #[arg(long)]
    pub(crate) seed: Option<PathBuf>,
    /// Emit compact JSON on a single line
    #[arg(long)]
    pub(crate) compact: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// JSON seed to read instead of the configured one
    #[arg(long)]
    pub(crate) seed: Option<PathBuf>,
    /// Only walk this tenant
    #[arg(long)]
    pub(crate) tenant: Option<String>,
    /// Locale for titles and fetched content (defaults to APP_DEFAULT_LOCALE)
    #[arg(long)]
    pub(crate) locale: Option<String>,
}

fn composition_config() -> Result<CompositionConfig, AppError> {
    Ok(AppConfig::load()?.composition)
}

fn load_assembler(seed_arg: Option<PathBuf>) -> Result<(SeedAssembler, SiteSeed), AppError> {
    let config = composition_config()?;
    let path = seed_arg.or_else(|| config.seed_path.clone());
    let seed = SiteSeed::load(path.as_deref())?;
    Ok((build_assembler(seed.clone(), config), seed))
}

pub(crate) async fn run_render(args: RenderArgs) -> Result<(), AppError> {
    let RenderArgs {
        tenant,
        page_type,
        page_id,
        locale,
        seed,
        compact,
    } = args;

    let (assembler, _) = load_assembler(seed)?;
    let mut identity = PageIdentity::new(tenant, page_type);
    if let Some(page_id) = page_id {
        identity = identity.with_page(page_id);
    }
    let locale = locale
        .as_deref()
        .map(Locale::new)
        .unwrap_or_else(|| assembler.default_locale().clone());

    let page = assembler.assemble(&identity, &locale).await?;
    let rendered = if compact {
        serde_json::to_string(&page)?
    } else {
        serde_json::to_string_pretty(&page)?
    };
    println!("{rendered}");
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        seed,
        tenant,
        locale,
    } = args;

    let (assembler, seed) = load_assembler(seed)?;
    let locale = locale
        .as_deref()
        .map(Locale::new)
        .unwrap_or_else(|| assembler.default_locale().clone());

    println!("Site composition demo ({locale})");
    for tenant_id in seed.tenants() {
        if tenant.as_deref().is_some_and(|wanted| wanted != tenant_id.0) {
            continue;
        }
        println!("\nTenant {tenant_id}");

        for page_type in seed.page_types_of(tenant_id) {
            let identity = PageIdentity::new(tenant_id.0.clone(), page_type.code.0.clone());
            render_summary(&assembler, &identity, &locale).await?;

            for page in seed
                .pages_of(tenant_id)
                .filter(|page| page.page_type == page_type.code)
            {
                let identity = identity.clone().with_page(page.id.0.clone());
                render_summary(&assembler, &identity, &locale).await?;
            }
        }
    }

    Ok(())
}

async fn render_summary(
    assembler: &SeedAssembler,
    identity: &PageIdentity,
    locale: &Locale,
) -> Result<(), AppError> {
    let label = match &identity.page_id {
        Some(page_id) => format!("{} / {}", identity.page_type, page_id),
        None => identity.page_type.to_string(),
    };

    let page = match assembler.assemble(identity, locale).await {
        Ok(page) => page,
        Err(err @ AssemblyError::ThemeMissing(_)) => {
            println!("- {label}: skipped ({err})");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    println!("- {label}{}", homepage_marker(&page));
    for block in &page.blocks {
        println!("    {}", describe_block(block));
    }
    for section in &page.sections {
        let status = match &section.error {
            Some(failure) => format!("unavailable ({})", failure.message),
            None => format!("{} of {}", section.items.len(), section.total),
        };
        println!("    [section] {}: {}", section.title, status);
    }
    Ok(())
}

fn homepage_marker(page: &AssembledPage) -> &'static str {
    if page.page.is_homepage {
        " (homepage)"
    } else {
        ""
    }
}

fn describe_block(block: &ResolvedBlock) -> String {
    let origin = if block.via_membership {
        "membership".to_string()
    } else {
        match block.source_scope {
            Scope::Tenant => "tenant".to_string(),
            Scope::PageType => "page type".to_string(),
            Scope::Page => "page".to_string(),
        }
    };
    let customized = block
        .provenance
        .values()
        .filter(|origin| **origin == FieldOrigin::Override)
        .count();

    let mut line = format!(
        "#{:<4} {}/{} [{}] from {}, {} customized field(s)",
        block.order, block.block_type, block.variant, block.instance_id, origin, customized
    );
    if let Some(content) = &block.resolved {
        match &content.error {
            Some(failure) => line.push_str(&format!(", data unavailable: {}", failure.message)),
            None => line.push_str(&format!(
                ", {} of {} item(s)",
                content.items.len(),
                content.total
            )),
        }
    }
    line
}
