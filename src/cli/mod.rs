//! Command-line front end for the booking core.
//!
//! Each invocation opens the configured storage profile, restores the saved
//! session and ledger, runs one intent and exits:
//! - `services` / `professionals` - browse the catalog
//! - `login`, `signup`, `logout`, `whoami` - manage the session
//! - `book`, `bookings`, `confirm`, `start`, `complete`, `cancel`, `rate` - work the ledger
//! - `stats`, `notifications` - dashboards
//! - `config check` - validate configuration file

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::db::{Booking, BookingStatus, Identity, Role, SignupRequest};
use crate::{BookingForm, Dashboard, Marketplace};

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "homeservices")]
#[command(author, version, about = "Book home services from the command line", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "HOMESERVICES_CONFIG", default_value = "homeservices.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List services in the catalog
    Services {
        /// Only services whose name or description contains this text
        #[arg(short, long)]
        search: Option<String>,
        /// Only services in this category ("All" for every category)
        #[arg(short = 'C', long)]
        category: Option<String>,
    },

    /// List professionals offering a service
    Professionals {
        /// Service ID
        #[arg(long)]
        service: String,
    },

    /// Log in as a customer, professional or admin
    Login {
        email: String,
        secret: String,
        #[arg(short, long, default_value = "customer")]
        role: Role,
    },

    /// Create a customer account and log in
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        address: String,
    },

    /// End the current session
    Logout,

    /// Show the logged-in account
    Whoami,

    /// Book a service as the logged-in customer
    Book {
        /// Service ID
        #[arg(long)]
        service: String,
        /// Professional ID
        #[arg(long)]
        professional: String,
        /// Date, YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// Time, HH:MM
        #[arg(long)]
        time: String,
        /// Service address (defaults to the customer's address)
        #[arg(long)]
        address: Option<String>,
        #[arg(long, default_value = "")]
        notes: String,
    },

    /// List bookings visible to the logged-in account
    Bookings {
        /// Only open bookings, soonest first (professionals)
        #[arg(long)]
        upcoming: bool,
    },

    /// Confirm a pending booking
    Confirm { id: String },

    /// Mark a booking as in progress
    Start { id: String },

    /// Mark a booking as completed
    Complete { id: String },

    /// Cancel a booking
    Cancel { id: String },

    /// Rate a booking from 1 to 5
    Rate {
        id: String,
        rating: u8,
        #[arg(long, default_value = "")]
        review: String,
    },

    /// Show dashboard figures for the logged-in account
    Stats,

    /// Show the notification feed
    Notifications {
        /// Mark a notification as read
        #[arg(long)]
        mark_read: Option<String>,
    },

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Check,
}

/// Run a CLI command
pub async fn run_command(command: Commands, config_path: &Path, config: Config) -> Result<()> {
    if let Commands::Config(ConfigCommands::Check) = command {
        return cmd_config_check(config_path);
    }

    let market = Marketplace::open(config)?;
    match command {
        Commands::Services { search, category } => {
            cmd_services(&market, search.as_deref(), category.as_deref())
        }
        Commands::Professionals { service } => cmd_professionals(&market, &service),
        Commands::Login {
            email,
            secret,
            role,
        } => {
            let identity = market.login(&email, &secret, role).await?;
            println!("Logged in as {} ({})", identity.name(), identity.role());
            Ok(())
        }
        Commands::Signup {
            name,
            email,
            password,
            phone,
            address,
        } => {
            let identity = market
                .signup(SignupRequest {
                    name,
                    email,
                    password,
                    phone,
                    address,
                })
                .await?;
            println!("Welcome, {}! Your customer id is {}", identity.name(), identity.id());
            Ok(())
        }
        Commands::Logout => {
            market.logout();
            println!("Logged out.");
            Ok(())
        }
        Commands::Whoami => cmd_whoami(&market),
        Commands::Book {
            service,
            professional,
            date,
            time,
            address,
            notes,
        } => {
            let address = address.unwrap_or_else(|| match market.session.current() {
                Some(Identity::Customer(c)) => c.address,
                _ => String::new(),
            });
            let booking = market.book(BookingForm {
                service_id: service,
                professional_id: professional,
                date,
                time,
                address,
                notes,
            })?;
            println!(
                "Booking {} created: ${:.2}, status {}",
                booking.id, booking.price, booking.status
            );
            Ok(())
        }
        Commands::Bookings { upcoming } => {
            let bookings = if upcoming {
                market.upcoming()?
            } else {
                market.my_bookings()?
            };
            print_bookings(&market, &bookings);
            Ok(())
        }
        Commands::Confirm { id } => cmd_set_status(&market, &id, BookingStatus::Confirmed),
        Commands::Start { id } => cmd_set_status(&market, &id, BookingStatus::InProgress),
        Commands::Complete { id } => cmd_set_status(&market, &id, BookingStatus::Completed),
        Commands::Cancel { id } => {
            let booking = market.cancel(&id)?;
            println!("Booking {} is now {}", booking.id, booking.status);
            Ok(())
        }
        Commands::Rate { id, rating, review } => {
            let booking = market.rate(&id, rating, &review)?;
            println!("Thank you for your feedback on booking {}!", booking.id);
            Ok(())
        }
        Commands::Stats => cmd_stats(&market),
        Commands::Notifications { mark_read } => cmd_notifications(&market, mark_read.as_deref()),
        Commands::Config(ConfigCommands::Check) => Ok(()),
    }
}

fn cmd_services(market: &Marketplace, search: Option<&str>, category: Option<&str>) -> Result<()> {
    let services = market
        .catalog
        .search_services(search.unwrap_or_default(), category);

    if services.is_empty() {
        println!("No services found.");
        return Ok(());
    }

    println!();
    println!(
        "{:<4}  {:<24}  {:<12}  {:>9}  {:<12}",
        "ID", "NAME", "CATEGORY", "PRICE", "DURATION"
    );
    println!("{}", "-".repeat(69));
    for service in &services {
        println!(
            "{:<4}  {:<24}  {:<12}  {:>9.2}  {:<12}",
            service.id,
            truncate(&service.name, 24),
            truncate(&service.category, 12),
            service.price,
            service.duration
        );
    }
    println!();
    println!(
        "{} service{} found. Categories: {}",
        services.len(),
        if services.len() == 1 { "" } else { "s" },
        market.catalog.categories().join(", ")
    );
    Ok(())
}

fn cmd_professionals(market: &Marketplace, service_id: &str) -> Result<()> {
    let Some(service) = market.catalog.service(service_id) else {
        anyhow::bail!("Service {} not found", service_id);
    };

    let professionals = market.catalog.professionals_for_service(service_id);
    if professionals.is_empty() {
        println!("No professionals offer {}.", service.name);
        return Ok(());
    }

    println!();
    println!("=== Professionals for {} ===", service.name);
    println!();
    for professional in professionals {
        let price = professional.custom_price(service_id).unwrap_or(service.price);
        println!(
            "  [{}] {:<20} {:.1} ({} reviews)  ${:.2}  {}",
            professional.id,
            professional.name,
            professional.rating,
            professional.review_count,
            price,
            professional.experience
        );
    }
    println!();
    Ok(())
}

fn cmd_whoami(market: &Marketplace) -> Result<()> {
    let Some(identity) = market.session.current() else {
        println!("Not logged in.");
        return Ok(());
    };

    println!();
    println!("Name:   {}", identity.name());
    println!("Role:   {}", identity.role());
    println!("ID:     {}", identity.id());
    println!("Email:  {}", identity.email().unwrap_or("-"));
    if !identity.image().is_empty() {
        println!("Image:  {}", identity.image());
    }
    match &identity {
        Identity::Customer(c) => {
            println!("Phone:  {}", c.phone);
            println!("Address: {}", c.address);
            println!("Member since: {}", c.member_since);
        }
        Identity::Professional(p) => {
            println!("Specialty: {}", p.specialty);
            println!("Hourly rate: ${:.2}", p.hourly_rate);
            println!("Services: {}", p.service_ids.join(", "));
        }
        Identity::Admin(_) => {}
    }
    println!();
    Ok(())
}

fn cmd_set_status(market: &Marketplace, id: &str, status: BookingStatus) -> Result<()> {
    let booking = market.set_status(id, status)?;
    println!("Booking {} is now {}", booking.id, booking.status);
    Ok(())
}

fn cmd_stats(market: &Marketplace) -> Result<()> {
    println!();
    match market.dashboard()? {
        Dashboard::Customer(stats) => {
            println!("Total bookings: {}", stats.total);
            println!("Completed:      {}", stats.completed);
            println!("Pending:        {}", stats.pending);
            println!("Cancelled:      {}", stats.cancelled);
        }
        Dashboard::Professional(stats) => {
            println!("Total bookings: {}", stats.total_bookings);
            println!("Completed:      {}", stats.completed_bookings);
            println!("Pending:        {}", stats.pending_bookings);
            println!("Earnings:       ${:.2}", stats.total_earnings);
            println!("Avg rating:     {:.1}", stats.average_rating);
        }
        Dashboard::Admin(overview) => {
            println!("Bookings:       {} ({} open)", overview.total_bookings, overview.open_bookings);
            println!("Customers:      {}", overview.customers);
            println!("Professionals:  {}", overview.professionals);
            println!("Services:       {}", overview.services);
            println!("Revenue:        ${:.2}", overview.revenue);
        }
    }
    println!();
    Ok(())
}

fn cmd_notifications(market: &Marketplace, mark_read: Option<&str>) -> Result<()> {
    market.session.require_role(&[Role::Customer, Role::Professional, Role::Admin])?;

    if let Some(id) = mark_read {
        market.ledger.mark_notification_read(id)?;
    }

    let notifications = market.ledger.notifications();
    if notifications.is_empty() {
        println!("No notifications.");
        return Ok(());
    }

    println!();
    println!("{} unread", market.ledger.unread_count());
    for n in notifications {
        println!(
            "  {} [{}] {:<15} {}  ({})",
            if n.read { " " } else { "*" },
            n.id,
            n.kind,
            n.message,
            n.timestamp
        );
    }
    println!();
    Ok(())
}

fn cmd_config_check(config_path: &Path) -> Result<()> {
    println!("Checking configuration file: {}", config_path.display());
    println!();

    if !config_path.exists() {
        println!(
            "[!!] Configuration file not found: {}",
            config_path.display()
        );
        println!();
        println!("Defaults will be used.");
        return Ok(());
    }

    match Config::load(config_path) {
        Ok(config) => {
            println!("[OK] Configuration file is valid!");
            println!();
            println!("Storage:");
            println!("  Backend:      {:?}", config.storage.backend);
            println!("  Data Dir:     {}", config.storage.data_dir.display());
            println!();
            println!("Auth:");
            println!("  Latency:      {} ms", config.auth.simulated_latency_ms);
            println!("  Pro domain:   {}", config.auth.professional_email_domain);
            println!();
            println!("Ledger:");
            println!("  Enforce transitions: {}", config.ledger.enforce_transitions);
            println!();
            println!(
                "Fixtures:       {}",
                config
                    .fixtures
                    .dir
                    .as_ref()
                    .map(|d| d.display().to_string())
                    .unwrap_or_else(|| "embedded".to_string())
            );
            println!("Log level:      {}", config.logging.level);
            Ok(())
        }
        Err(e) => {
            println!("[!!] Configuration file is invalid: {:#}", e);
            Err(e)
        }
    }
}

fn print_bookings(market: &Marketplace, bookings: &[Booking]) {
    if bookings.is_empty() {
        println!("No bookings found.");
        return;
    }

    println!();
    println!(
        "{:<14}  {:<20}  {:<16}  {:<10}  {:<5}  {:<11}  {:>8}  {:<6}",
        "ID", "SERVICE", "PROFESSIONAL", "DATE", "TIME", "STATUS", "PRICE", "RATING"
    );
    println!("{}", "-".repeat(104));
    for booking in bookings {
        let service = market
            .catalog
            .service(&booking.service_id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| "-".to_string());
        let professional = market
            .catalog
            .professional(&booking.professional_id)
            .map(|p| p.name)
            .unwrap_or_else(|| "-".to_string());
        let rating = booking
            .rating
            .map(|r| format!("{}/5", r))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<14}  {:<20}  {:<16}  {:<10}  {:<5}  {:<11}  {:>8.2}  {:<6}",
            booking.id,
            truncate(&service, 20),
            truncate(&professional, 16),
            booking.date,
            booking.time,
            booking.status.to_string(),
            booking.price,
            rating
        );
    }
    println!();
}

/// Truncate a string to a maximum length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
