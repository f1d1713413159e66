use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use shared::domain::ProfileId;
use showcase_api::{profile_view, submit_comment, ApiContext};
use storage::{Storage, DEFAULT_DATABASE_URL};

#[derive(Parser, Debug)]
#[command(about = "Inspect and annotate the profile showcase store")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    ListProfiles,
    ShowProfile {
        profile_id: i64,
    },
    AddComment {
        profile_id: i64,
        rating: i64,
        comment: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("warn").init();

    let cli = Cli::parse();
    let ctx = ApiContext::new(Storage::new(DEFAULT_DATABASE_URL).await?);

    match cli.command {
        Command::ListProfiles => {
            for profile in ctx.storage.list_profiles().await? {
                println!(
                    "{}\t{}\t{}\t{}",
                    profile.profile_id.0, profile.name, profile.school, profile.department
                );
            }
        }
        Command::ShowProfile { profile_id } => {
            let view = profile_view(&ctx, ProfileId(profile_id))
                .await
                .map_err(|e| anyhow!(e.message))?;
            println!("{} ({}, {})", view.name, view.school, view.department);
            println!("capabilities: {}", view.capabilities.join(" | "));
            for event in &view.events {
                println!("{} ({} - {})", event.name, event.start_date, event.end_date);
                for point in &event.points {
                    println!("  - {point}");
                }
            }
            println!(
                "average rating: {} ({:.1}/5)",
                view.average_stars, view.average_rating
            );
            for comment in &view.comments {
                println!(
                    "{} - {} ({}/5) - {}",
                    comment.created_at.format("%Y-%m-%d %H:%M:%S"),
                    comment.stars,
                    comment.rating,
                    comment.comment
                );
            }
        }
        Command::AddComment {
            profile_id,
            rating,
            comment,
        } => {
            submit_comment(&ctx, ProfileId(profile_id), &comment, rating)
                .await
                .map_err(|e| anyhow!(e.message))?;
            println!("comment added to profile_id={profile_id}");
        }
    }

    Ok(())
}
