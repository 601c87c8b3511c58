//! Upload page served at `/`.
//!
//! A single static document: it logs in against `/token`, keeps the token
//! in `localStorage`, uploads through `XMLHttpRequest` so progress can be
//! shown, and retries once with a fresh token when the upload gets a 401.

/// The upload page.
pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Background Remover</title>
    <style>
        * { box-sizing: border-box; }
        body {
            margin: 0;
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
            background: #1a1a2e;
            color: #eee;
        }
        main { max-width: 720px; margin: 0 auto; padding: 32px 16px; }
        h1 { font-size: 1.6rem; margin: 0 0 24px; }
        fieldset {
            border: 1px solid #333;
            border-radius: 8px;
            padding: 16px;
            margin: 0 0 24px;
        }
        legend { padding: 0 8px; color: #aaa; }
        label { display: block; margin: 8px 0 4px; font-size: 0.9rem; color: #bbb; }
        input[type="text"], input[type="password"] {
            width: 100%;
            padding: 8px;
            border: 1px solid #444;
            border-radius: 4px;
            background: #16213e;
            color: #eee;
        }
        button {
            margin-top: 12px;
            padding: 8px 20px;
            border: none;
            border-radius: 4px;
            background: #4a9eff;
            color: #fff;
            cursor: pointer;
        }
        button:disabled { background: #555; cursor: default; }
        progress { width: 100%; height: 12px; margin-top: 12px; }
        .status { margin-top: 12px; font-size: 0.9rem; color: #aaa; min-height: 1.2em; }
        .status.error { color: #ff6b6b; }
        .preview {
            display: none;
            margin-top: 16px;
            padding: 16px;
            border-radius: 8px;
            background-color: #fff;
            background-image:
                linear-gradient(45deg, #ccc 25%, transparent 25%),
                linear-gradient(-45deg, #ccc 25%, transparent 25%),
                linear-gradient(45deg, transparent 75%, #ccc 75%),
                linear-gradient(-45deg, transparent 75%, #ccc 75%);
            background-size: 20px 20px;
            background-position: 0 0, 0 10px, 10px -10px, -10px 0;
        }
        .preview img { max-width: 100%; display: block; margin: 0 auto; }
        a.download { display: inline-block; margin-top: 12px; color: #4a9eff; }
    </style>
</head>
<body>
<main>
    <h1>Background Remover</h1>

    <fieldset>
        <legend>Sign in</legend>
        <form id="login-form">
            <label for="username">Username</label>
            <input id="username" name="username" type="text" autocomplete="username" required>
            <label for="password">Password</label>
            <input id="password" name="password" type="password" autocomplete="current-password" required>
            <button type="submit">Sign in</button>
        </form>
        <div class="status" id="login-status"></div>
    </fieldset>

    <fieldset>
        <legend>Remove background</legend>
        <form id="upload-form">
            <label for="image">Image</label>
            <input id="image" name="image" type="file" accept="image/*" required>
            <button type="submit" id="upload-button">Upload</button>
        </form>
        <progress id="progress" value="0" max="100" hidden></progress>
        <div class="status" id="upload-status"></div>
        <div class="preview" id="preview">
            <img id="result" alt="Result">
        </div>
        <a class="download" id="download" download="result.png" hidden>Download PNG</a>
    </fieldset>
</main>

<script>
(function () {
    const TOKEN_KEY = 'bg-remover-token';

    const loginForm = document.getElementById('login-form');
    const loginStatus = document.getElementById('login-status');
    const uploadForm = document.getElementById('upload-form');
    const uploadButton = document.getElementById('upload-button');
    const uploadStatus = document.getElementById('upload-status');
    const progress = document.getElementById('progress');
    const preview = document.getElementById('preview');
    const result = document.getElementById('result');
    const download = document.getElementById('download');

    let lastCredentials = null;
    let resultUrl = null;

    function setStatus(el, text, isError) {
        el.textContent = text;
        el.classList.toggle('error', !!isError);
    }

    async function login(username, password) {
        const body = new URLSearchParams({ username: username, password: password });
        const response = await fetch('/token', {
            method: 'POST',
            headers: { 'Content-Type': 'application/x-www-form-urlencoded' },
            body: body
        });
        if (!response.ok) {
            let message = 'Login failed (' + response.status + ')';
            try {
                const data = await response.json();
                if (data.message) { message = data.message; }
            } catch (e) {}
            throw new Error(message);
        }
        const data = await response.json();
        localStorage.setItem(TOKEN_KEY, data.access_token);
        return data.access_token;
    }

    function upload(file, token) {
        return new Promise(function (resolve, reject) {
            const xhr = new XMLHttpRequest();
            xhr.open('POST', '/remove-background');
            xhr.setRequestHeader('Authorization', 'Bearer ' + token);
            xhr.responseType = 'blob';

            xhr.upload.onprogress = function (event) {
                if (event.lengthComputable) {
                    progress.value = Math.round((event.loaded / event.total) * 100);
                }
            };
            xhr.onload = function () { resolve(xhr); };
            xhr.onerror = function () { reject(new Error('Network error')); };

            const form = new FormData();
            form.append('image', file);
            xhr.send(form);
        });
    }

    async function errorText(xhr) {
        try {
            const text = await xhr.response.text();
            try {
                const data = JSON.parse(text);
                return data.message || text;
            } catch (e) {
                return text;
            }
        } catch (e) {
            return 'Request failed (' + xhr.status + ')';
        }
    }

    function showResult(blob) {
        if (resultUrl) { URL.revokeObjectURL(resultUrl); }
        resultUrl = URL.createObjectURL(blob);
        result.src = resultUrl;
        download.href = resultUrl;
        preview.style.display = 'block';
        download.hidden = false;
    }

    loginForm.addEventListener('submit', async function (event) {
        event.preventDefault();
        const username = document.getElementById('username').value;
        const password = document.getElementById('password').value;
        setStatus(loginStatus, 'Signing in...');
        try {
            await login(username, password);
            lastCredentials = { username: username, password: password };
            setStatus(loginStatus, 'Signed in as ' + username);
        } catch (e) {
            localStorage.removeItem(TOKEN_KEY);
            setStatus(loginStatus, e.message, true);
        }
    });

    uploadForm.addEventListener('submit', async function (event) {
        event.preventDefault();
        const file = document.getElementById('image').files[0];
        if (!file) { return; }

        let token = localStorage.getItem(TOKEN_KEY);
        if (!token) {
            setStatus(uploadStatus, 'Sign in first', true);
            return;
        }

        uploadButton.disabled = true;
        progress.hidden = false;
        progress.value = 0;
        setStatus(uploadStatus, 'Uploading...');

        try {
            let xhr = await upload(file, token);

            if (xhr.status === 401 && lastCredentials) {
                setStatus(uploadStatus, 'Session expired, signing in again...');
                token = await login(lastCredentials.username, lastCredentials.password);
                progress.value = 0;
                xhr = await upload(file, token);
            }

            if (xhr.status === 200) {
                showResult(xhr.response);
                setStatus(uploadStatus, 'Done');
            } else if (xhr.status === 401) {
                localStorage.removeItem(TOKEN_KEY);
                setStatus(uploadStatus, 'Session expired, sign in again', true);
            } else {
                setStatus(uploadStatus, await errorText(xhr), true);
            }
        } catch (e) {
            setStatus(uploadStatus, e.message, true);
        } finally {
            uploadButton.disabled = false;
            progress.hidden = true;
        }
    });
})();
</script>
</body>
</html>
"##;
