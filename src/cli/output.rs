use crate::engine::StackView;
use crate::store::{Block, Stack, StackStats};
use console::style;
use std::fmt::Display;

/// Centralized output formatting utilities for consistent CLI presentation
pub struct Output;

impl Output {
    /// Print a success message with checkmark
    pub fn success<T: Display>(message: T) {
        println!("{} {}", style("✓").green(), message);
    }

    /// Print an error message with X mark
    pub fn error<T: Display>(message: T) {
        println!("{} {}", style("✗").red(), message);
    }

    /// Print a warning message
    pub fn warning<T: Display>(message: T) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    /// Print an info message
    pub fn info<T: Display>(message: T) {
        println!("{} {}", style("ℹ").cyan(), message);
    }

    /// Print a sub-item with arrow prefix
    pub fn sub_item<T: Display>(message: T) {
        println!("  {} {}", style("→").dim(), message);
    }

    /// Print a tip/suggestion
    pub fn tip<T: Display>(message: T) {
        println!("{} {}", style("TIP:").cyan(), style(message).dim());
    }

    /// Print a divider line
    pub fn divider() {
        println!("{}", style("─".repeat(50)).dim());
    }

    /// Print a stack header with its naming configuration
    pub fn stack_header(stack: &Stack) {
        println!(
            "{} {} | target: {} | bookmarks: {} | commits: {}",
            style("Stack").bold(),
            style(&stack.name).cyan(),
            style(&stack.target_bookmark).cyan(),
            format_prefix(&stack.bookmark_prefix),
            format_prefix(&stack.commit_prefix),
        );
    }

    /// Print one block line: index, change id, name, lifecycle markers.
    /// Done blocks render green, submitted-but-open ones yellow.
    pub fn block_line(block: &Block, current_change_id: Option<&str>) {
        let current = current_change_id == Some(block.change_id.as_str());
        let marker = if current { ">" } else { " " };
        let line = format!(
            "{marker} {}. {} {}{}{}",
            block.position,
            block.change_id,
            block.name,
            if block.is_submitted { " [submitted]" } else { "" },
            if current { " (current)" } else { "" },
        );

        if block.is_done {
            println!("{}", style(line).green());
        } else if block.is_submitted {
            println!("{}", style(line).yellow());
        } else {
            println!("{line}");
        }
    }

    /// Render a full engine view: header, blocks, status line
    pub fn stack_view(view: &StackView, current_change_id: Option<&str>) {
        Self::stack_header(&view.stack);
        Self::divider();
        for block in &view.blocks {
            Self::block_line(block, current_change_id);
        }
        Self::divider();
        Self::success(&view.status);
    }

    /// Print one row of the stack list: done/total progress and name
    pub fn stack_list_line(stack: &Stack, stats: &StackStats, is_current: bool) {
        let line = format!(
            "{}/{} {}{}",
            stats.done,
            stats.total,
            stack.name,
            if is_current { " (current)" } else { "" },
        );
        if stats.total > 0 && stats.done == stats.total {
            println!("  {}", style(line).green());
        } else {
            println!("  {line}");
        }
    }
}

fn format_prefix(prefix: &str) -> String {
    if prefix.is_empty() {
        style("(none)").dim().to_string()
    } else {
        format!("'{prefix}'")
    }
}
