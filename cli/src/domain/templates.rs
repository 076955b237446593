//! Rendered configuration files: the nginx virtual host and `wp-config.php`.
//!
//! Pure functions only.

use std::fmt::Write as _;

use crate::domain::secrets::SaltSet;

/// Debian's stock FastCGI snippet, referenced by the default vhost.
pub const FASTCGI_SNIPPET: &str = "snippets/fastcgi-php.conf";

/// How PHP requests are handed to FastCGI in the rendered vhost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastcgiMode {
    /// `include snippets/fastcgi-php.conf;`
    Snippet,
    /// The snippet's directives written out inline, for hosts without it.
    Inline,
}

const SNIPPET_BLOCK: &str = "        include snippets/fastcgi-php.conf;";

const INLINE_BLOCK: &str = r"        fastcgi_split_path_info ^(.+?\.php)(/.*)$;
        try_files $fastcgi_script_name =404;
        set $path_info $fastcgi_path_info;
        fastcgi_param PATH_INFO $path_info;
        fastcgi_index index.php;
        include fastcgi_params;
        fastcgi_param SCRIPT_FILENAME $document_root$fastcgi_script_name;";

const VHOST_TEMPLATE: &str = r"server {
    listen 80;
    listen [::]:80;
    server_name __DOMAIN__ www.__DOMAIN__;

    root __ROOT__;
    index index.php index.html;

    client_max_body_size __UPLOAD__;

    location / {
        try_files $uri $uri/ /index.php?$args;
    }

    location ~ \.php$ {
__FASTCGI__
        fastcgi_pass unix:__SOCKET__;
    }

    location ~ /\.ht {
        deny all;
    }

    location = /favicon.ico { log_not_found off; access_log off; }
    location = /robots.txt { log_not_found off; access_log off; allow all; }

    location ~* \.(css|gif|ico|jpeg|jpg|js|png|svg|webp|woff2?)$ {
        expires max;
        log_not_found off;
    }
}
";

/// PHP-FPM socket for `php_version`, e.g. `/run/php/php8.3-fpm.sock`.
#[must_use]
pub fn fpm_socket(php_version: &str) -> String {
    format!("/run/php/php{php_version}-fpm.sock")
}

/// Inputs for [`render_vhost`].
pub struct VhostParams<'a> {
    pub domain: &'a str,
    pub root: &'a str,
    pub php_version: &'a str,
    pub upload_limit: &'a str,
    pub fastcgi: FastcgiMode,
}

/// Render the nginx server block for the site.
#[must_use]
pub fn render_vhost(params: &VhostParams<'_>) -> String {
    let fastcgi = match params.fastcgi {
        FastcgiMode::Snippet => SNIPPET_BLOCK,
        FastcgiMode::Inline => INLINE_BLOCK,
    };
    VHOST_TEMPLATE
        .replace("__DOMAIN__", params.domain)
        .replace("__ROOT__", params.root)
        .replace("__UPLOAD__", params.upload_limit)
        .replace("__FASTCGI__", fastcgi)
        .replace("__SOCKET__", &fpm_socket(params.php_version))
}

/// Inputs for [`render_wp_config`].
pub struct WpConfigParams<'a> {
    pub db_name: &'a str,
    pub db_user: &'a str,
    pub db_password: &'a str,
    pub salts: &'a SaltSet,
}

/// Render `wp-config.php`.
///
/// Every value is written inside a PHP single-quoted literal; callers pass
/// only generated identifiers and secrets, none of which contain `'` or `\`.
#[must_use]
pub fn render_wp_config(params: &WpConfigParams<'_>) -> String {
    let mut out = String::from("<?php\n");
    let mut define = |name: &str, value: &str| {
        let _ = writeln!(out, "define( '{name}', '{value}' );");
    };
    define("DB_NAME", params.db_name);
    define("DB_USER", params.db_user);
    define("DB_PASSWORD", params.db_password);
    define("DB_HOST", "localhost");
    define("DB_CHARSET", "utf8mb4");
    define("DB_COLLATE", "");
    for (slot, value) in params.salts.iter() {
        define(slot, value);
    }
    define("FS_METHOD", "direct");
    out.push_str(
        "\n$table_prefix = 'wp_';\n\
         \n\
         define( 'WP_DEBUG', false );\n\
         \n\
         if ( ! defined( 'ABSPATH' ) ) {\n\
         \tdefine( 'ABSPATH', __DIR__ . '/' );\n\
         }\n\
         \n\
         require_once ABSPATH . 'wp-settings.php';\n",
    );
    out
}
