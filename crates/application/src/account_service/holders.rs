use super::*;

impl AccountService {
    /// Lists the clients attached to an account.
    pub async fn list_holders(
        &self,
        actor: &UserIdentity,
        account_id: Uuid,
    ) -> AppResult<Vec<AccountHolder>> {
        self.authorization_service
            .require_permission(actor, Permission::AccountsRead)
            .await?;

        Ok(self.load(account_id).await?.holders)
    }

    /// Attaches a client. Fails with a conflict for duplicates, a second primary
    /// holder or a closed account.
    pub async fn add_holder(
        &self,
        actor: &UserIdentity,
        account_id: Uuid,
        holder: AccountHolder,
    ) -> AppResult<Mutation<AccountHolder>> {
        self.authorization_service
            .require_permission(actor, Permission::AccountsUpdate)
            .await?;

        let account = self.load(account_id).await?;
        account.ensure_can_add_holder(&holder)?;

        let mut recorder = OperationRecorder::begin(actor, &account, Utc::now());
        recorder.record_related(None, Some(&holder));
        self.repository
            .insert_holder(account_id, &holder, &recorder.finish())
            .await?;

        Ok(Mutation::created(holder))
    }

    /// Detaches a client from an account.
    pub async fn remove_holder(
        &self,
        actor: &UserIdentity,
        account_id: Uuid,
        client_id: Uuid,
    ) -> AppResult<Mutation<()>> {
        self.authorization_service
            .require_permission(actor, Permission::AccountsUpdate)
            .await?;

        let account = self.load(account_id).await?;
        let holder = account.holder(client_id)?.clone();

        let mut recorder = OperationRecorder::begin(actor, &account, Utc::now());
        recorder.record_related(Some(&holder), None);
        self.repository
            .delete_holder(account_id, client_id, &recorder.finish())
            .await?;

        Ok(Mutation::deleted(&holder))
    }
}
