//! 把解析後的 CLI 指令分派到各管理畫面，回傳要印到 stdout 的文字。

use crate::app::account::AccountScreen;
use crate::app::affiliate::{LinksScreen, NetworksScreen};
use crate::app::auth::{require_auth, AuthService};
use crate::app::billing::{BillingOverview, TiersScreen};
use crate::app::dashboard::{load_overview, render_totals};
use crate::app::families::FamiliesScreen;
use crate::app::subscription::SubscriptionService;
use crate::app::users::UsersScreen;
use crate::config::toml_config::AppSettings;
use crate::config::{
    AffiliateCommand, Command, FamilyArgs, FamilyCommand, LinkArgs, LinkCommand, NetworkArgs,
    NetworkCommand, PaymentMethodCommand, PlanCommand, ProfileCommand, TierArgs, TierCommand,
    UserCommand,
};
use crate::core::affiliate::{generate_affiliate_url, summarize, SortDirection};
use crate::core::http::ApiClient;
use crate::core::plan_change::PlanChangeFlow;
use crate::core::resource::{render_detail, OutputFormat, Resource, ResourceTable};
use crate::core::screen::ListState;
use crate::domain::forms::{
    AffiliateLinkForm, FamilyForm, LoginRequest, MemberRoleUpdate, MembershipForm, NetworkForm,
    NewPaymentMethod, NewUser, PasswordChange, ProfileForm, TierForm, UserUpdate,
};
use crate::domain::model::{BillingCycle, Profile};
use crate::utils::error::{AdminError, Result};
use chrono::NaiveDate;

pub struct CommandContext {
    pub api: ApiClient,
    pub format: OutputFormat,
    pub app_name: Option<String>,
    pub today: NaiveDate,
}

impl CommandContext {
    pub fn new(api: ApiClient, settings: &AppSettings, today: NaiveDate) -> Self {
        Self {
            api,
            format: settings.format,
            app_name: settings.app_name.clone(),
            today,
        }
    }

    fn table<R: Resource>(&self, rows: &[R]) -> Result<String> {
        ResourceTable::new(rows).render(self.format)
    }

    fn detail<R: Resource>(&self, row: &R) -> Result<String> {
        render_detail(row, self.format)
    }

    fn subscriptions(&self) -> SubscriptionService {
        SubscriptionService::new(self.api.clone()).with_app_name(self.app_name.clone())
    }
}

/// 變更後的訊息列；清單重新載入失敗時附上提示
fn outcome<T>(state: &ListState<T>) -> String {
    let mut text = state.banner().map(|b| b.to_string()).unwrap_or_default();
    if state.is_stale() {
        text.push_str("\n⚠️ The list could not be reloaded; list it again to see the latest data.");
    }
    text
}

pub async fn execute(command: Command, ctx: &CommandContext) -> Result<String> {
    if command.requires_auth() {
        require_auth(ctx.api.session())?;
    }

    match command {
        Command::Login { email, password } => {
            let auth = AuthService::new(ctx.api.clone());
            let user = auth.login(&LoginRequest { email, password }).await?;
            Ok(match user {
                Some(user) => format!("✅ Logged in as {} ({})", user.name, user.role),
                None => "✅ Logged in".to_string(),
            })
        }
        Command::Logout => {
            AuthService::new(ctx.api.clone()).logout()?;
            Ok("Logged out".to_string())
        }
        Command::Users { action } => users(action, ctx).await,
        Command::Families { action } => families(action, ctx).await,
        Command::Tiers { action } => tiers(action, ctx).await,
        Command::Subscriptions => {
            let mut overview = BillingOverview::new(ctx.api.clone());
            let rows = overview.load_subscriptions().await?.to_vec();
            ctx.table(&rows)
        }
        Command::Payments => {
            let mut overview = BillingOverview::new(ctx.api.clone());
            let rows = overview.load_payments().await?.to_vec();
            ctx.table(&rows)
        }
        Command::Plan { action } => plan(action, ctx).await,
        Command::PaymentMethods { action } => payment_methods(action, ctx).await,
        Command::Affiliate { action } => affiliate(action, ctx).await,
        Command::Profile { action } => profile(action, ctx).await,
        Command::Home => home(ctx).await,
        Command::Dashboard => {
            let overview = load_overview(&ctx.api, ctx.today).await?;
            if ctx.format == OutputFormat::Json {
                return Ok(serde_json::to_string_pretty(&overview)?);
            }
            Ok(overview.render())
        }
    }
}

fn profile_lines(profile: &Profile) -> Vec<(String, String)> {
    vec![
        ("Name".to_string(), profile.display_name()),
        ("Email".to_string(), profile.email.clone()),
        (
            "Phone".to_string(),
            profile.phone.clone().unwrap_or_else(|| "-".to_string()),
        ),
    ]
}

async fn profile(action: ProfileCommand, ctx: &CommandContext) -> Result<String> {
    let mut screen = AccountScreen::new(ctx.api.clone());
    let profile = match action {
        ProfileCommand::Show => screen.load().await?,
        ProfileCommand::Update {
            first_name,
            last_name,
            email,
            phone,
        } => {
            let current = screen.load().await?;
            let mut form = ProfileForm::from(&current);
            if let Some(first_name) = first_name {
                form.first_name = first_name;
            }
            if let Some(last_name) = last_name {
                form.last_name = last_name;
            }
            if let Some(email) = email {
                form.email = email;
            }
            if phone.is_some() {
                form.phone = phone;
            }
            screen.update(form).await?
        }
    };
    if ctx.format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(&profile)?);
    }
    let details = render_summary(profile_lines(&profile));
    Ok(match screen.banner() {
        Some(banner) => format!("{}\n\n{}", banner, details),
        None => details,
    })
}

async fn home(ctx: &CommandContext) -> Result<String> {
    let home = AccountScreen::new(ctx.api.clone()).home().await?;
    if ctx.format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(&home)?);
    }
    let mut lines = profile_lines(&home.profile);
    lines.push((
        "Family".to_string(),
        home.family
            .as_ref()
            .map(|f| format!("{} ({} members)", f.family_name, f.members.len()))
            .unwrap_or_else(|| "No family yet".to_string()),
    ));
    lines.push((
        "Plan".to_string(),
        home.plan
            .as_ref()
            .map(|p| {
                format!(
                    "{} ${}/{}, renews {}",
                    p.name,
                    p.price,
                    p.billing_cycle.unit(),
                    p.renewal_date
                )
            })
            .unwrap_or_else(|| "No active subscription".to_string()),
    ));
    Ok(render_summary(lines))
}

async fn users(action: UserCommand, ctx: &CommandContext) -> Result<String> {
    let mut screen = UsersScreen::new(ctx.api.clone());
    match action {
        UserCommand::List => {
            let rows = screen.load().await?.to_vec();
            ctx.table(&rows)
        }
        UserCommand::Show { id } => {
            let user = screen.get(id).await?;
            let mut out = ctx.detail(&user)?;
            if ctx.format != OutputFormat::Json {
                let families = screen.families(id).await?;
                out.push_str("\n\n");
                out.push_str(&ctx.table(&families)?);
            }
            Ok(out)
        }
        UserCommand::Create {
            name,
            email,
            password,
            role,
        } => {
            screen
                .create(&NewUser {
                    name,
                    email,
                    password,
                    role,
                })
                .await?;
            Ok(outcome(screen.state()))
        }
        UserCommand::Update {
            id,
            name,
            email,
            role,
        } => {
            screen.update(id, &UserUpdate { name, email, role }).await?;
            Ok(outcome(screen.state()))
        }
        UserCommand::Delete { id } => {
            screen.delete(id).await?;
            Ok(outcome(screen.state()))
        }
        UserCommand::Password {
            id,
            password,
            confirm,
        } => {
            screen
                .change_password(
                    id,
                    &PasswordChange {
                        password,
                        confirm_password: confirm,
                    },
                )
                .await?;
            Ok(outcome(screen.state()))
        }
        UserCommand::Families { id } => {
            let rows = screen.families(id).await?;
            ctx.table(&rows)
        }
        UserCommand::AvailableFamilies { id } => {
            let rows = screen.available_families(id).await?;
            ResourceTable::new(&rows).without_actions().render(ctx.format)
        }
        UserCommand::AddToFamily {
            id,
            family,
            role,
            admin,
        } => {
            screen
                .add_to_family(family, &MembershipForm::new(id, role, admin))
                .await?;
            Ok(outcome(screen.state()))
        }
        UserCommand::RemoveFromFamily { id, family } => {
            screen.remove_from_family(family, id).await?;
            Ok(outcome(screen.state()))
        }
        UserCommand::SetFamilyRole {
            id,
            family,
            role,
            admin,
        } => {
            screen
                .update_family_role(
                    family,
                    id,
                    &MemberRoleUpdate {
                        role,
                        is_admin: admin,
                    },
                )
                .await?;
            Ok(outcome(screen.state()))
        }
        UserCommand::CreateFamily {
            id,
            name,
            billing_email,
        } => {
            let family = screen
                .create_family_for(
                    id,
                    &FamilyForm {
                        family_name: name,
                        billing_email,
                        subscription_tier_id: None,
                    },
                )
                .await?;
            Ok(format!(
                "{} (family #{})",
                outcome(screen.state()),
                family.id
            ))
        }
    }
}

fn family_form(args: FamilyArgs) -> FamilyForm {
    FamilyForm {
        family_name: args.name,
        billing_email: args.billing_email,
        subscription_tier_id: args.tier,
    }
}

async fn families(action: FamilyCommand, ctx: &CommandContext) -> Result<String> {
    let mut screen = FamiliesScreen::new(ctx.api.clone());
    match action {
        FamilyCommand::List => {
            let rows = screen.load().await?.to_vec();
            ctx.table(&rows)
        }
        FamilyCommand::Show { id } => {
            let family = screen.get(id).await?;
            let mut out = ctx.detail(&family)?;
            if ctx.format != OutputFormat::Json {
                out.push_str("\n\n");
                out.push_str(&ctx.table(&family.members)?);
            }
            Ok(out)
        }
        FamilyCommand::Create(args) => {
            screen.create(&family_form(args)).await?;
            Ok(outcome(screen.state()))
        }
        FamilyCommand::Update { id, family } => {
            screen.update(id, &family_form(family)).await?;
            Ok(outcome(screen.state()))
        }
        FamilyCommand::Delete { id } => {
            screen.delete(id).await?;
            Ok(outcome(screen.state()))
        }
        FamilyCommand::Members { id } => {
            let rows = screen.members(id).await?;
            ctx.table(&rows)
        }
        FamilyCommand::AddMember {
            id,
            user,
            role,
            admin,
        } => {
            screen
                .add_member(id, &MembershipForm::new(user, role, admin))
                .await?;
            Ok(outcome(screen.state()))
        }
        FamilyCommand::UpdateMember {
            id,
            user,
            role,
            admin,
        } => {
            screen
                .update_member(
                    id,
                    user,
                    &MemberRoleUpdate {
                        role,
                        is_admin: admin,
                    },
                )
                .await?;
            Ok(outcome(screen.state()))
        }
        FamilyCommand::RemoveMember { id, user } => {
            screen.remove_member(id, user).await?;
            Ok(outcome(screen.state()))
        }
    }
}

fn tier_form(args: TierArgs) -> Result<TierForm> {
    let features = match args.features.as_deref() {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| AdminError::validation("features", format!("Invalid JSON: {}", e)))?,
        None => serde_json::json!({}),
    };
    Ok(TierForm {
        name: args.name,
        description: args.description,
        price_monthly: args.monthly,
        price_yearly: args.yearly,
        features,
        is_active: !args.inactive,
        stripe_price_id_monthly: None,
        stripe_price_id_yearly: None,
    })
}

async fn tiers(action: TierCommand, ctx: &CommandContext) -> Result<String> {
    let mut screen = TiersScreen::new(ctx.api.clone());
    match action {
        TierCommand::List => {
            let rows = screen.load().await?.to_vec();
            ctx.table(&rows)
        }
        TierCommand::Create(args) => {
            screen.create(&tier_form(args)?).await?;
            Ok(outcome(screen.state()))
        }
        TierCommand::Update { id, tier } => {
            screen.update(id, &tier_form(tier)?).await?;
            Ok(outcome(screen.state()))
        }
        TierCommand::Delete { id } => {
            screen.delete(id).await?;
            Ok(outcome(screen.state()))
        }
    }
}

fn select(flow: &mut PlanChangeFlow, plan: &str, cycle: Option<BillingCycle>) -> Result<()> {
    if let Some(cycle) = cycle {
        flow.set_billing_cycle(cycle)?;
    }
    flow.select_plan(plan)
}

fn render_summary(lines: Vec<(String, String)>) -> String {
    let width = lines.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);
    lines
        .iter()
        .map(|(k, v)| format!("{:<width$}  {}", k, v, width = width))
        .collect::<Vec<_>>()
        .join("\n")
}

async fn plan(action: PlanCommand, ctx: &CommandContext) -> Result<String> {
    let service = ctx.subscriptions();
    match action {
        PlanCommand::Show => {
            let current = service.current().await?;
            let plan = &current.plan;
            if ctx.format == OutputFormat::Json {
                return Ok(serde_json::to_string_pretty(plan)?);
            }
            let mut out = render_summary(vec![
                ("Plan".to_string(), format!("{} ({})", plan.name, plan.tier)),
                (
                    "Price".to_string(),
                    format!("${}/{}", plan.price, plan.billing_cycle.unit()),
                ),
                ("Renews".to_string(), plan.renewal_date.to_string()),
                ("Features".to_string(), plan.features.join(", ")),
            ]);
            out.push_str("\n\n");
            out.push_str(&ctx.table(&current.payment_methods)?);
            Ok(out)
        }
        PlanCommand::Plans => {
            let flow = service.open_flow(ctx.today).await?;
            let mut out = ctx.table(flow.catalog())?;
            if ctx.format == OutputFormat::Table {
                let names: Vec<&str> = flow.catalog().iter().map(|p| p.name.as_str()).collect();
                out.push_str("\n\nFeature comparison: ");
                out.push_str(&names.join(" | "));
                for row in flow.comparison_rows() {
                    let marks: Vec<&str> = row
                        .included
                        .iter()
                        .map(|included| if *included { "✓" } else { "-" })
                        .collect();
                    out.push_str(&format!("\n  {}: {}", row.feature, marks.join(" | ")));
                }
            }
            Ok(out)
        }
        PlanCommand::Estimate { plan, cycle, quote } => {
            let mut flow = service.open_flow(ctx.today).await?;
            select(&mut flow, &plan, cycle)?;
            let Some(summary) = flow.summary() else {
                return Ok("This is your current plan; there is nothing to change.".to_string());
            };
            let mut out = format!(
                "{} to {}\n{}",
                summary.direction.verb(),
                summary.plan_name,
                render_summary(summary.lines())
            );
            if quote {
                if let Some(amount) = service.quote_for(&flow).await? {
                    out.push_str(&format!("\nServer proration quote  ${}", amount));
                }
            }
            Ok(out)
        }
        PlanCommand::Change {
            plan,
            cycle,
            payment_method,
            yes,
        } => {
            let mut flow = service.open_flow(ctx.today).await?;
            select(&mut flow, &plan, cycle)?;
            if let Some(method) = payment_method.as_deref() {
                flow.select_payment_method(method)?;
            }
            let summary = flow.continue_to_confirm()?;
            let review = render_summary(summary.lines());
            if !yes {
                flow.cancel_confirmation();
                return Ok(format!(
                    "{}\n\nRe-run with --yes to confirm this change.",
                    review
                ));
            }
            let updated = flow.confirm(&service).await?;
            Ok(format!(
                "{}\n\n✅ Subscription updated to {} ({})",
                review, updated.name, updated.billing_cycle
            ))
        }
        PlanCommand::Cancel {
            subscription_id,
            immediately,
        } => {
            service.cancel(&subscription_id, immediately).await?;
            Ok(if immediately {
                "Subscription canceled".to_string()
            } else {
                "Subscription will cancel at the end of the current period".to_string()
            })
        }
    }
}

async fn payment_methods(action: PaymentMethodCommand, ctx: &CommandContext) -> Result<String> {
    let service = ctx.subscriptions();
    let methods = match action {
        PaymentMethodCommand::List => service.payment_methods().await?,
        PaymentMethodCommand::Add { token, default } => {
            service
                .add_payment_method(&NewPaymentMethod {
                    payment_method_token: token,
                    set_as_default: default,
                })
                .await?
        }
        PaymentMethodCommand::SetDefault { id } => service.set_default_payment_method(&id).await?,
    };
    ctx.table(&methods)
}

fn network_form(args: NetworkArgs) -> NetworkForm {
    NetworkForm {
        name: args.name,
        display_name: args.display_name,
        affiliate_id: args.affiliate_id,
        url_pattern: args.url_pattern,
        tracking_param: args.tracking_param,
        base_commission_rate: args.commission,
        is_active: !args.inactive,
    }
}

async fn link_form(args: LinkArgs, ctx: &CommandContext) -> Result<AffiliateLinkForm> {
    let mut form = AffiliateLinkForm {
        name: args.name,
        original_url: args.original_url,
        affiliate_url: args.affiliate_url.unwrap_or_default(),
        network: args.network,
        category: args.category,
        commission_rate: args.commission,
        is_active: !args.inactive,
        app_source: args.app_source,
    };
    if form.affiliate_url.trim().is_empty() {
        let mut networks = NetworksScreen::new(ctx.api.clone());
        networks.load().await?;
        let network = networks.find(&form.network).cloned();
        LinksScreen::prepare(&mut form, network.as_ref())?;
    }
    Ok(form)
}

async fn affiliate(action: AffiliateCommand, ctx: &CommandContext) -> Result<String> {
    match action {
        AffiliateCommand::Networks { action } => {
            let mut screen = NetworksScreen::new(ctx.api.clone());
            match action {
                NetworkCommand::List => {
                    let rows = screen.load().await?.to_vec();
                    ctx.table(&rows)
                }
                NetworkCommand::Create(args) => {
                    screen.create(&network_form(args)).await?;
                    Ok(outcome(screen.state()))
                }
                NetworkCommand::Update { id, network } => {
                    screen.update(id, &network_form(network)).await?;
                    Ok(outcome(screen.state()))
                }
                NetworkCommand::Enable { id } => {
                    screen.set_active(id, true).await?;
                    Ok(outcome(screen.state()))
                }
                NetworkCommand::Disable { id } => {
                    screen.set_active(id, false).await?;
                    Ok(outcome(screen.state()))
                }
                NetworkCommand::Delete { id } => {
                    screen.delete(id).await?;
                    Ok(outcome(screen.state()))
                }
            }
        }
        AffiliateCommand::Links { action } => {
            let mut screen = LinksScreen::new(ctx.api.clone());
            match action {
                LinkCommand::List {
                    search,
                    sort,
                    desc,
                    page,
                } => {
                    screen.load().await?;
                    let query = screen.query_mut();
                    if let Some(term) = search.as_deref() {
                        query.set_search(term);
                    }
                    if let Some(field) = sort {
                        query.sort_by(field);
                        query.direction = if desc {
                            SortDirection::Desc
                        } else {
                            SortDirection::Asc
                        };
                    }
                    query.page = page;
                    let visible = screen.visible();
                    let mut out = ctx.table(&visible.items)?;
                    if ctx.format == OutputFormat::Table {
                        out.push_str(&format!(
                            "\n\nPage {} of {}",
                            visible.page, visible.total_pages
                        ));
                    }
                    Ok(out)
                }
                LinkCommand::Create(args) => {
                    let form = link_form(args, ctx).await?;
                    screen.create(&form).await?;
                    Ok(outcome(screen.state()))
                }
                LinkCommand::Update { id, link } => {
                    let form = link_form(link, ctx).await?;
                    screen.update(id, &form).await?;
                    Ok(outcome(screen.state()))
                }
                LinkCommand::Enable { id } => {
                    screen.set_active(id, true).await?;
                    Ok(outcome(screen.state()))
                }
                LinkCommand::Disable { id } => {
                    screen.set_active(id, false).await?;
                    Ok(outcome(screen.state()))
                }
                LinkCommand::Delete { id } => {
                    screen.delete(id).await?;
                    Ok(outcome(screen.state()))
                }
                LinkCommand::Stats { id, period } => {
                    let stats = screen.stats(id, period).await?;
                    if ctx.format == OutputFormat::Json {
                        return Ok(serde_json::to_string_pretty(&stats)?);
                    }
                    Ok(render_summary(vec![
                        ("Period".to_string(), period.label().to_string()),
                        ("Clicks".to_string(), stats.clicks.to_string()),
                        ("Conversions".to_string(), stats.conversions.to_string()),
                        (
                            "Commission earned".to_string(),
                            format!("${:.2}", stats.commission_earned),
                        ),
                    ]))
                }
            }
        }
        AffiliateCommand::GenerateUrl { network, url } => {
            let mut screen = NetworksScreen::new(ctx.api.clone());
            screen.load().await?;
            let found = screen.find(&network).ok_or_else(|| {
                AdminError::validation(
                    "network",
                    format!("Unknown affiliate network '{}'", network),
                )
            })?;
            generate_affiliate_url(found, &url)
        }
        AffiliateCommand::Summary => {
            let mut screen = LinksScreen::new(ctx.api.clone());
            let summary = summarize(screen.load().await?);
            if ctx.format == OutputFormat::Json {
                return Ok(serde_json::to_string_pretty(&summary)?);
            }
            let mut out = render_totals("All links:", &summary.overall);
            out.push_str("\nBy network\n");
            for (network, totals) in &summary.by_network {
                out.push_str(&render_totals(&format!("  {}:", network), totals));
            }
            out.push_str("\nBy category\n");
            for (category, totals) in &summary.by_category {
                out.push_str(&render_totals(&format!("  {}:", category), totals));
            }
            Ok(out)
        }
    }
}
