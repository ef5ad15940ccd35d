// src/models/auth.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Estrutura de dados ("claims") dentro do JWT emitido pelo serviço de login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,    // Subject (ID do funcionário)
    pub name: String, // Nome exibido nos pedidos e no livro-razão
    #[serde(default)]
    pub role: String,
    pub exp: usize,   // Expiration time (quando o token expira)
}

/// Quem está executando a operação. Passado explicitamente a cada serviço.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    pub user_id: Uuid,
    pub name: String,
    pub role: String,
}

impl ActorContext {
    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case("admin")
    }
}

impl From<Claims> for ActorContext {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            name: claims.name,
            role: claims.role,
        }
    }
}
