pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use self::args::*;

#[cfg(feature = "cli")]
mod args {
    use super::toml_config::{AppSettings, Overrides, TomlConfig};
    use crate::core::affiliate::LinkSortField;
    use crate::core::resource::OutputFormat;
    use crate::domain::model::{BillingCycle, Role, StatsPeriod};
    use crate::utils::error::Result;
    use clap::{Args, Parser, Subcommand};
    use rust_decimal::Decimal;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "family-admin")]
    #[command(about = "Administration console for family subscription accounts")]
    pub struct CliConfig {
        #[arg(long, global = true, env = "FAMILY_ADMIN_API_URL")]
        pub api_url: Option<String>,

        #[arg(long, global = true, env = "FAMILY_ADMIN_CONFIG")]
        pub config: Option<String>,

        #[arg(long, global = true, env = "FAMILY_ADMIN_SESSION_FILE")]
        pub session_file: Option<String>,

        #[arg(long, global = true)]
        pub timeout: Option<u64>,

        #[arg(long, global = true, help = "Restrict the plan catalog to one app")]
        pub app_name: Option<String>,

        #[arg(long, global = true, help = "Output format: table, csv, tsv or json")]
        pub format: Option<OutputFormat>,

        #[arg(long, global = true, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, global = true, help = "Emit logs as JSON")]
        pub log_json: bool,

        #[command(subcommand)]
        pub command: Command,
    }

    impl CliConfig {
        /// 合併 TOML 設定檔（若有指定）與命令列旗標
        pub fn settings(&self) -> Result<AppSettings> {
            let file = match &self.config {
                Some(path) => {
                    tracing::debug!("Loading configuration from {}", path);
                    Some(TomlConfig::from_file(path)?)
                }
                None => None,
            };
            AppSettings::merge(
                file.as_ref(),
                Overrides {
                    api_url: self.api_url.clone(),
                    session_file: self.session_file.clone(),
                    timeout_seconds: self.timeout,
                    format: self.format,
                    app_name: self.app_name.clone(),
                },
            )
        }
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum Command {
        /// Log in and store the session token
        Login {
            #[arg(long)]
            email: String,
            #[arg(long, env = "FAMILY_ADMIN_PASSWORD", hide_env_values = true)]
            password: String,
        },
        Logout,
        Users {
            #[command(subcommand)]
            action: UserCommand,
        },
        Families {
            #[command(subcommand)]
            action: FamilyCommand,
        },
        Tiers {
            #[command(subcommand)]
            action: TierCommand,
        },
        /// List active subscriptions
        Subscriptions,
        /// List payment history
        Payments,
        Plan {
            #[command(subcommand)]
            action: PlanCommand,
        },
        PaymentMethods {
            #[command(subcommand)]
            action: PaymentMethodCommand,
        },
        Affiliate {
            #[command(subcommand)]
            action: AffiliateCommand,
        },
        Profile {
            #[command(subcommand)]
            action: ProfileCommand,
        },
        /// Show the signed-in user's profile, family and plan
        Home,
        /// Show user, family and affiliate totals
        Dashboard,
    }

    impl Command {
        /// 除了登入以外都需要有效的 session
        pub fn requires_auth(&self) -> bool {
            !matches!(self, Self::Login { .. } | Self::Logout)
        }
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum UserCommand {
        List,
        Show {
            id: i64,
        },
        Create {
            #[arg(long)]
            name: String,
            #[arg(long)]
            email: String,
            #[arg(long)]
            password: String,
            #[arg(long, default_value = "user")]
            role: Role,
        },
        Update {
            id: i64,
            #[arg(long)]
            name: Option<String>,
            #[arg(long)]
            email: Option<String>,
            #[arg(long)]
            role: Option<Role>,
        },
        Delete {
            id: i64,
        },
        Password {
            id: i64,
            #[arg(long)]
            password: String,
            #[arg(long)]
            confirm: String,
        },
        Families {
            id: i64,
        },
        AvailableFamilies {
            id: i64,
        },
        AddToFamily {
            id: i64,
            #[arg(long)]
            family: i64,
            #[arg(long)]
            role: Option<String>,
            #[arg(long)]
            admin: bool,
        },
        RemoveFromFamily {
            id: i64,
            #[arg(long)]
            family: i64,
        },
        SetFamilyRole {
            id: i64,
            #[arg(long)]
            family: i64,
            #[arg(long)]
            role: String,
            #[arg(long)]
            admin: bool,
        },
        /// Create a family and add the user as its admin
        CreateFamily {
            id: i64,
            #[arg(long)]
            name: String,
            #[arg(long)]
            billing_email: Option<String>,
        },
    }

    #[derive(Debug, Clone, Args)]
    pub struct FamilyArgs {
        #[arg(long)]
        pub name: String,
        #[arg(long)]
        pub billing_email: Option<String>,
        #[arg(long)]
        pub tier: Option<i64>,
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum FamilyCommand {
        List,
        Show {
            id: i64,
        },
        Create(FamilyArgs),
        Update {
            id: i64,
            #[command(flatten)]
            family: FamilyArgs,
        },
        Delete {
            id: i64,
        },
        Members {
            id: i64,
        },
        AddMember {
            id: i64,
            #[arg(long)]
            user: i64,
            #[arg(long)]
            role: Option<String>,
            #[arg(long)]
            admin: bool,
        },
        UpdateMember {
            id: i64,
            #[arg(long)]
            user: i64,
            #[arg(long)]
            role: String,
            #[arg(long)]
            admin: bool,
        },
        RemoveMember {
            id: i64,
            #[arg(long)]
            user: i64,
        },
    }

    #[derive(Debug, Clone, Args)]
    pub struct TierArgs {
        #[arg(long)]
        pub name: String,
        #[arg(long)]
        pub description: Option<String>,
        #[arg(long)]
        pub monthly: Decimal,
        #[arg(long)]
        pub yearly: Decimal,
        #[arg(long, help = "Feature flags as a JSON object")]
        pub features: Option<String>,
        #[arg(long)]
        pub inactive: bool,
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum TierCommand {
        List,
        Create(TierArgs),
        Update {
            id: i64,
            #[command(flatten)]
            tier: TierArgs,
        },
        Delete {
            id: i64,
        },
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum PlanCommand {
        /// Show the current plan and saved payment methods
        Show,
        /// List available plans with a feature comparison
        Plans,
        /// Estimate the prorated charge of a plan change without applying it
        Estimate {
            plan: String,
            #[arg(long)]
            cycle: Option<BillingCycle>,
            #[arg(long, help = "Also ask the server for its proration figure")]
            quote: bool,
        },
        Change {
            plan: String,
            #[arg(long)]
            cycle: Option<BillingCycle>,
            #[arg(long)]
            payment_method: Option<String>,
            #[arg(long, help = "Confirm the change without the review step")]
            yes: bool,
        },
        Cancel {
            subscription_id: String,
            #[arg(long)]
            immediately: bool,
        },
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum PaymentMethodCommand {
        List,
        Add {
            #[arg(long)]
            token: String,
            #[arg(long)]
            default: bool,
        },
        SetDefault {
            id: String,
        },
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum AffiliateCommand {
        Networks {
            #[command(subcommand)]
            action: NetworkCommand,
        },
        Links {
            #[command(subcommand)]
            action: LinkCommand,
        },
        /// Build an affiliate URL for a network
        GenerateUrl {
            #[arg(long)]
            network: String,
            url: String,
        },
        /// Clicks, conversions and commission by network and category
        Summary,
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum ProfileCommand {
        Show,
        /// Omitted fields keep their current values
        Update {
            #[arg(long)]
            first_name: Option<String>,
            #[arg(long)]
            last_name: Option<String>,
            #[arg(long)]
            email: Option<String>,
            #[arg(long)]
            phone: Option<String>,
        },
    }

    #[derive(Debug, Clone, Args)]
    pub struct NetworkArgs {
        #[arg(long)]
        pub name: String,
        #[arg(long)]
        pub display_name: String,
        #[arg(long)]
        pub affiliate_id: String,
        #[arg(long)]
        pub url_pattern: Option<String>,
        #[arg(long)]
        pub tracking_param: Option<String>,
        #[arg(long, default_value = "0")]
        pub commission: Decimal,
        #[arg(long)]
        pub inactive: bool,
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum NetworkCommand {
        List,
        Create(NetworkArgs),
        Update {
            id: i64,
            #[command(flatten)]
            network: NetworkArgs,
        },
        Enable {
            id: i64,
        },
        Disable {
            id: i64,
        },
        Delete {
            id: i64,
        },
    }

    #[derive(Debug, Clone, Args)]
    pub struct LinkArgs {
        #[arg(long)]
        pub name: String,
        #[arg(long)]
        pub original_url: String,
        #[arg(long, help = "Generated from the network when omitted")]
        pub affiliate_url: Option<String>,
        #[arg(long)]
        pub network: String,
        #[arg(long)]
        pub category: Option<String>,
        #[arg(long)]
        pub commission: Option<Decimal>,
        #[arg(long)]
        pub app_source: Option<String>,
        #[arg(long)]
        pub inactive: bool,
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum LinkCommand {
        List {
            #[arg(long)]
            search: Option<String>,
            #[arg(long)]
            sort: Option<LinkSortField>,
            #[arg(long)]
            desc: bool,
            #[arg(long, default_value = "1")]
            page: usize,
        },
        Create(LinkArgs),
        Update {
            id: i64,
            #[command(flatten)]
            link: LinkArgs,
        },
        Enable {
            id: i64,
        },
        Disable {
            id: i64,
        },
        Delete {
            id: i64,
        },
        Stats {
            id: i64,
            #[arg(long, default_value = "month")]
            period: StatsPeriod,
        },
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_profile_update() {
            let cli = CliConfig::try_parse_from([
                "family-admin",
                "profile",
                "update",
                "--first-name",
                "Ada",
                "--phone",
                "555-0100",
            ])
            .unwrap();
            match cli.command {
                Command::Profile {
                    action:
                        ProfileCommand::Update {
                            first_name,
                            last_name,
                            phone,
                            ..
                        },
                } => {
                    assert_eq!(first_name.as_deref(), Some("Ada"));
                    assert!(last_name.is_none());
                    assert_eq!(phone.as_deref(), Some("555-0100"));
                }
                other => panic!("unexpected command: {:?}", other),
            }
        }

        #[test]
        fn test_parse_user_create() {
            let cli = CliConfig::try_parse_from([
                "family-admin",
                "--format",
                "json",
                "users",
                "create",
                "--name",
                "Ada",
                "--email",
                "ada@example.com",
                "--password",
                "secret1",
                "--role",
                "admin",
            ])
            .unwrap();
            assert_eq!(cli.format, Some(OutputFormat::Json));
            assert!(cli.command.requires_auth());
            match cli.command {
                Command::Users {
                    action: UserCommand::Create { role, .. },
                } => assert_eq!(role, Role::Admin),
                other => panic!("unexpected command {:?}", other),
            }
        }

        #[test]
        fn test_login_does_not_require_auth() {
            let cli = CliConfig::try_parse_from([
                "family-admin",
                "login",
                "--email",
                "ada@example.com",
                "--password",
                "secret1",
            ])
            .unwrap();
            assert!(!cli.command.requires_auth());
        }

        #[test]
        fn test_plan_change_parses_cycle() {
            let cli = CliConfig::try_parse_from([
                "family-admin",
                "plan",
                "change",
                "professional",
                "--cycle",
                "yearly",
                "--yes",
            ])
            .unwrap();
            match cli.command {
                Command::Plan {
                    action: PlanCommand::Change { plan, cycle, yes, .. },
                } => {
                    assert_eq!(plan, "professional");
                    assert_eq!(cycle, Some(BillingCycle::Yearly));
                    assert!(yes);
                }
                other => panic!("unexpected command {:?}", other),
            }
        }

        #[test]
        fn test_rejects_unknown_format() {
            assert!(CliConfig::try_parse_from(["family-admin", "--format", "xml", "logout"]).is_err());
        }
    }
}
