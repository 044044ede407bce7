use marketplace_admin::{
    dashboard::{AdminAction, AdminDashboard},
    logging::init_tracing,
    services::{InMemoryBackend, ViewContext},
    session::{logout, MemorySession},
    views::ViewKind,
};

#[tokio::main]
async fn main() {
    init_tracing();

    let backend = InMemoryBackend::new_with_sample();
    let session = MemorySession::with_token("demo-admin-token");
    let mut dashboard = AdminDashboard::new(backend.clone());

    let mut ctx = ViewContext::default();
    match dashboard.refresh_all(&mut ctx, &session).await {
        Ok(failures) => {
            for (kind, error) in failures {
                eprintln!("{kind} -> {error}");
            }
        }
        Err(error) => {
            eprintln!("refresh -> {error}");
            return;
        }
    }
    print_summary(&dashboard);

    for kind in ViewKind::ALL {
        println!("{kind}:");
        for item in ctx.context.list(kind.list_key()) {
            println!("  {item}");
        }
    }

    let auto_yes = |prompt: &str| {
        println!("{prompt} [y]");
        true
    };
    if let Err(error) = dashboard
        .perform(
            ViewKind::Transactions,
            AdminAction::Approve,
            "t-1",
            &mut ctx,
            &session,
            &auto_yes,
        )
        .await
    {
        eprintln!("approve t-1 -> {error}");
    }
    if let Err(error) = dashboard
        .perform(
            ViewKind::Verifications,
            AdminAction::Reject,
            "u-300",
            &mut ctx,
            &session,
            &auto_yes,
        )
        .await
    {
        eprintln!("reject u-300 -> {error}");
    }

    let mut search = ViewContext::default();
    dashboard.render_view(ViewKind::Freelancers, &mut search, "linh");
    println!(
        "freelancers matching \"linh\": {}",
        search.context.list(ViewKind::Freelancers.list_key()).len()
    );

    print_summary(&dashboard);
    for entry in &ctx.actions {
        println!("[{}] {} {} {}", entry.timestamp, entry.view, entry.action, entry.details);
    }

    if let Err(error) = logout(&backend, &session).await {
        eprintln!("logout -> {error}");
    }
}

fn print_summary(dashboard: &AdminDashboard<InMemoryBackend>) {
    match serde_json::to_string_pretty(&dashboard.summary()) {
        Ok(summary) => println!("{summary}"),
        Err(error) => eprintln!("summary -> {error}"),
    }
}
