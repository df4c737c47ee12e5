//! Budget display formatting
//!
//! Formats budgets, budget summaries and alerts for terminal output.

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::models::{BudgetAlert, ProjectBudget};
use crate::services::BudgetSummary;

#[derive(Tabled)]
struct BudgetRow {
    #[tabled(rename = "Project")]
    project: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Total")]
    total: String,
    #[tabled(rename = "Spent")]
    spent: String,
    #[tabled(rename = "Remaining")]
    remaining: String,
    #[tabled(rename = "Used")]
    used: String,
    #[tabled(rename = "Tier")]
    tier: String,
}

#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Tier")]
    tier: String,
    #[tabled(rename = "Spent")]
    spent: String,
    #[tabled(rename = "Used")]
    used: String,
    #[tabled(rename = "Raised")]
    raised: String,
    #[tabled(rename = "Ack")]
    acknowledged: String,
}

/// Format budgets as a table
pub fn format_budget_list(budgets: &[ProjectBudget]) -> String {
    if budgets.is_empty() {
        return "No budgets found.\n".to_string();
    }

    let rows = budgets.iter().map(|b| BudgetRow {
        project: b.project_id.to_string(),
        name: b.name.clone(),
        total: b.total_budget.to_string(),
        spent: b.spent_amount.to_string(),
        remaining: b.remaining().to_string(),
        used: format!("{:.1}%", b.percent_used()),
        tier: b.current_tier().to_string(),
    });

    let mut table = Table::new(rows);
    table.with(Style::psql());
    format!("{}\n", table)
}

/// Format a budget summary with category breakdown and alert state
pub fn format_budget_summary(summary: &BudgetSummary) -> String {
    let mut output = String::new();

    output.push_str(&format!("Budget: {}\n", summary.name));
    output.push_str(&format!("  ID:         {}\n", summary.budget_id));
    output.push_str(&format!("  Project:    {}\n", summary.project_id));
    output.push('\n');
    output.push_str(&format!("  Total:      {}\n", summary.total_budget));
    output.push_str(&format!("  Spent:      {}\n", summary.spent_amount));
    output.push_str(&format!("  Remaining:  {}\n", summary.remaining));
    output.push_str(&format!("  Used:       {:.1}%\n", summary.percent_used));

    output.push_str("\n  By category:\n");
    for category in &summary.categories {
        let budgeted = category
            .budgeted
            .map(|m| m.to_string())
            .unwrap_or_else(|| "-".to_string());
        let remaining = category
            .remaining
            .map(|m| m.to_string())
            .unwrap_or_else(|| "-".to_string());
        output.push_str(&format!(
            "    {:10} {:>12} spent of {:>12}, {:>12} left\n",
            category.category.to_string(),
            category.spent.to_string(),
            budgeted,
            remaining
        ));
    }

    let counts = &summary.expense_counts;
    output.push_str(&format!(
        "\n  Expenses:   {} pending, {} approved, {} rejected, {} reimbursed\n",
        counts.pending, counts.approved, counts.rejected, counts.reimbursed
    ));

    let alerts = &summary.alerts;
    output.push_str(&format!("  Tier:       {}\n", alerts.current_tier));
    if alerts.unacknowledged > 0 {
        output.push_str(&format!(
            "\n  {} of {} alerts unacknowledged\n",
            alerts.unacknowledged, alerts.total_alerts
        ));
    }

    output
}

/// Format alerts as a table
pub fn format_alert_list(alerts: &[BudgetAlert]) -> String {
    if alerts.is_empty() {
        return "No alerts found.\n".to_string();
    }

    let rows = alerts.iter().map(|a| AlertRow {
        id: a.id.to_string(),
        tier: a.alert_type.to_string(),
        spent: a.current_amount.to_string(),
        used: format!("{:.1}%", a.percentage_used),
        raised: a.created_at.format("%Y-%m-%d %H:%M").to_string(),
        acknowledged: match &a.acknowledged_by {
            Some(by) if a.is_acknowledged => by.clone(),
            _ => String::new(),
        },
    });

    let mut table = Table::new(rows);
    table.with(Style::psql());
    format!("{}\n", table)
}
