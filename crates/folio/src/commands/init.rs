//! Scaffold a new site.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::project_root;

/// Run the init command.
pub async fn run(config_path: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing folio...");

    let root = project_root(config_path);
    let content_dir = root.join("content");

    if content_dir.exists() && !yes {
        tracing::warn!(
            "{} already exists. Use --yes to overwrite.",
            content_dir.display()
        );
        return Ok(());
    }

    scaffold(&root, config_path, yes)?;

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'folio build' to build the site.");

    Ok(())
}

/// Write the starter files. Existing files are kept unless `overwrite` is set.
pub(crate) fn scaffold(root: &Path, config_path: &Path, overwrite: bool) -> Result<()> {
    let posts_dir = root.join("content").join("posts");
    fs::create_dir_all(&posts_dir).context("Failed to create content directory")?;
    fs::create_dir_all(root.join("static")).context("Failed to create static directory")?;

    write_starter(config_path, DEFAULT_CONFIG, overwrite)?;
    write_starter(&posts_dir.join("first-post.md"), DEFAULT_POST, overwrite)?;

    Ok(())
}

fn write_starter(path: &Path, contents: &str, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        tracing::debug!("Keeping existing {}", path.display());
        return Ok(());
    }

    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Created {}", path.display());
    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# folio configuration

[site]
title = "My Site"
base_url = "/"

[content]
dir = "content"

[build]
output = "public"
static_dir = "static"
minify = true
paginate = 10

[highlight]
theme = "InspiredGitHub"

[diagrams]
# "client" draws mermaid in the browser; "command" pipes diagrams through [diagrams.commands]
mode = "client"

# [deploy]
# command = ["rsync", "-a", "{output}/", "host:/srv/www"]
"#;

const DEFAULT_POST: &str = r#"---
title: "First Post"
date: 2024-01-15T10:00:00Z
description: "Tables, code and diagrams"
tags: ["hugo", "papermod"]
---

Welcome to your new site.

## A table

| Feature | Supported |
|---------|:---------:|
| Tables  | yes       |
| Code    | yes       |

## Some code

```go
package main

import "fmt"

func main() {
	fmt.Println("hello")
}
```

## A diagram

```mermaid
graph LR
  Write --> Build --> Publish
```
"#;
